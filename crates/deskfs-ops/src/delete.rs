//! Delete planning.

use deskfs_core::{FsError, FsResult, FsTree, NodeId};

use crate::operation::{Operation, Planned};

/// Plan removing `target` and its whole subtree.
///
/// The inverse carries a full snapshot of the subtree so undo restores the
/// original ids at the original sibling position.
pub fn plan_delete(tree: &FsTree, target: NodeId) -> FsResult<Planned> {
    if target == tree.root_id() {
        return Err(FsError::RootImmutable);
    }
    let node = tree.node(target)?;
    let parent = node.parent.ok_or(FsError::RootImmutable)?;
    let index = tree.index_in_parent(target);
    let snapshot = tree.snapshot(target)?;

    let description = match snapshot.len() {
        1 => format!("Deleted '{}'", node.name),
        n => format!("Deleted '{}' and {} nested items", node.name, n - 1),
    };

    Ok(Planned {
        forward: Operation::Delete { target },
        inverse: Operation::Create {
            parent,
            index,
            subtree: snapshot,
        },
        description,
        target,
    })
}

/// Drop every id whose ancestor is also in the list, keeping order.
///
/// Acting on a folder already covers its descendants.
pub fn top_level(tree: &FsTree, ids: &[NodeId]) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = Vec::with_capacity(ids.len());
    for id in ids {
        if out.contains(id) {
            continue;
        }
        if tree.ancestors(*id).any(|a| ids.contains(&a)) {
            continue;
        }
        out.push(*id);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskfs_core::{CollisionPolicy, Node};

    #[test]
    fn test_delete_then_restore_keeps_position() {
        let mut tree = FsTree::with_folders(&["a", "b", "c"]);
        let root = tree.root_id();
        let b = tree.child_by_name(root, "b").unwrap();
        let inner = tree.allocate_id();
        tree.insert(Node::new_folder(inner, "inner"), b, None, CollisionPolicy::Reject)
            .unwrap();
        let before = tree.children(root).unwrap().to_vec();

        let planned = plan_delete(&tree, b).unwrap();
        planned.forward.apply(&mut tree).unwrap();
        assert!(!tree.contains(b));
        assert!(!tree.contains(inner));

        planned.inverse.apply(&mut tree).unwrap();
        assert_eq!(tree.children(root).unwrap(), before.as_slice());
        assert_eq!(tree.children(b).unwrap(), &[inner]);
    }

    #[test]
    fn test_delete_root_fails() {
        let tree = FsTree::new();
        assert_eq!(
            plan_delete(&tree, tree.root_id()).unwrap_err(),
            FsError::RootImmutable
        );
    }

    #[test]
    fn test_top_level_drops_descendants() {
        let mut tree = FsTree::with_folders(&["a", "b"]);
        let root = tree.root_id();
        let a = tree.child_by_name(root, "a").unwrap();
        let b = tree.child_by_name(root, "b").unwrap();
        let nested = tree.allocate_id();
        tree.insert(Node::new_folder(nested, "n"), a, None, CollisionPolicy::Reject)
            .unwrap();

        assert_eq!(top_level(&tree, &[nested, b, a, b]), vec![b, a]);
    }
}
