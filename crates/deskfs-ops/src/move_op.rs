//! Move planning.

use deskfs_core::{CollisionPolicy, FsError, FsResult, FsTree, NodeId};

use crate::operation::{Operation, Planned};
use crate::rename::validate_name;

/// Plan moving `source` into the folder `target`.
///
/// Checks run in a fixed order: root, existence, cycle, folder. A name that
/// is taken in the destination is auto-suffixed and must still fit in
/// `max_len`. Moving a node into the folder it already lives in plans an
/// in-place move whose forward and inverse are the same, so it still gets
/// its own history entry.
pub fn plan_move(
    tree: &FsTree,
    source: NodeId,
    target: NodeId,
    max_len: usize,
) -> FsResult<Planned> {
    if source == tree.root_id() {
        return Err(FsError::RootImmutable);
    }
    let node = tree.node(source)?;
    tree.node(target)?;
    if tree.is_ancestor_or_self(source, target) {
        return Err(FsError::CyclicMove {
            source_id: source,
            target,
        });
    }
    let destination = tree.folder(target)?;

    let old_parent = node.parent.ok_or(FsError::RootImmutable)?;
    let old_index = tree.index_in_parent(source);
    let (index, name) = if old_parent == target {
        (old_index, node.name.clone())
    } else {
        let name = tree.settle_name(target, &node.name, Some(source), CollisionPolicy::AutoSuffix)?;
        validate_name(&name, max_len)?;
        (None, name)
    };

    Ok(Planned {
        forward: Operation::Move {
            target: source,
            parent: target,
            index,
            name: name.to_string(),
        },
        inverse: Operation::Move {
            target: source,
            parent: old_parent,
            index: old_index,
            name: node.name.to_string(),
        },
        description: format!("Moved '{}' to '{}'", node.name, destination.name),
        target: source,
    })
}
