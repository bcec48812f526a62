//! File and folder creation planning.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use deskfs_core::{Content, FsResult, FsTree, Node, NodeId, Subtree};

use crate::operation::{Operation, Planned};
use crate::rename::validate_name;

/// The kind of item to create.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    File,
}

/// Plan the creation of a new item under `parent`.
///
/// A taken name is auto-suffixed with the lowest free number, so creating
/// "New Folder" three times yields "New Folder", "New Folder (2)" and
/// "New Folder (3)". Content is ignored for folders.
pub fn plan_create(
    tree: &mut FsTree,
    parent: NodeId,
    name: &str,
    kind: ItemKind,
    content: Option<Content>,
    max_len: usize,
) -> FsResult<Planned> {
    tree.folder(parent)?;
    validate_name(name, max_len)?;

    let id = tree.allocate_id();
    let node = match kind {
        ItemKind::Folder => Node::new_folder(id, name),
        ItemKind::File => Node::new_file(id, name, content),
    };
    let description = format!("Created {kind} '{name}'");
    plan_insert(tree, parent, Subtree::single(node)?, max_len, description)
}

/// Plan inserting a detached subtree under `parent`.
///
/// The top node's name is settled against its future siblings here, so the
/// forward operation replays without further renaming. A settled name that
/// outgrows `max_len` is rejected.
pub fn plan_insert(
    tree: &FsTree,
    parent: NodeId,
    mut subtree: Subtree,
    max_len: usize,
    description: impl Into<String>,
) -> FsResult<Planned> {
    tree.folder(parent)?;
    let name = tree.unique_child_name(parent, &subtree.top().name, None);
    validate_name(&name, max_len)?;
    subtree.set_top_name(name);

    let target = subtree.top_id();
    Ok(Planned {
        forward: Operation::Create {
            parent,
            index: None,
            subtree,
        },
        inverse: Operation::Delete { target },
        description: description.into(),
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskfs_core::{DEFAULT_MAX_NAME_LEN, FsError};

    fn create(tree: &mut FsTree, name: &str) -> NodeId {
        let root = tree.root_id();
        let planned =
            plan_create(tree, root, name, ItemKind::Folder, None, DEFAULT_MAX_NAME_LEN).unwrap();
        planned.forward.apply(tree).unwrap();
        planned.target
    }

    #[test]
    fn test_create_auto_suffixes() {
        let mut tree = FsTree::new();
        let ids: Vec<_> = (0..3).map(|_| create(&mut tree, "New Folder")).collect();
        let names: Vec<_> = ids
            .into_iter()
            .map(|id| tree.node(id).unwrap().name.to_string())
            .collect();
        assert_eq!(names, ["New Folder", "New Folder (2)", "New Folder (3)"]);
    }

    #[test]
    fn test_create_inverse_is_delete() {
        let mut tree = FsTree::new();
        let root = tree.root_id();
        let planned = plan_create(
            &mut tree,
            root,
            "notes.txt",
            ItemKind::File,
            Some(Content::Text("hello".into())),
            DEFAULT_MAX_NAME_LEN,
        )
        .unwrap();
        planned.forward.apply(&mut tree).unwrap();
        assert_eq!(tree.node(planned.target).unwrap().size, 5);

        planned.inverse.apply(&mut tree).unwrap();
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_create_under_file_fails() {
        let mut tree = FsTree::new();
        let root = tree.root_id();
        let planned = plan_create(
            &mut tree,
            root,
            "a.txt",
            ItemKind::File,
            None,
            DEFAULT_MAX_NAME_LEN,
        )
        .unwrap();
        planned.forward.apply(&mut tree).unwrap();

        let err = plan_create(
            &mut tree,
            planned.target,
            "b",
            ItemKind::Folder,
            None,
            DEFAULT_MAX_NAME_LEN,
        )
        .unwrap_err();
        assert_eq!(
            err,
            FsError::NotAFolder {
                id: planned.target
            }
        );
    }

    #[test]
    fn test_create_invalid_name() {
        let mut tree = FsTree::new();
        let root = tree.root_id();
        let err = plan_create(&mut tree, root, "a/b", ItemKind::Folder, None, 255).unwrap_err();
        assert!(matches!(err, FsError::InvalidName { .. }));
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_item_kind_parse() {
        assert_eq!("FOLDER".parse::<ItemKind>().unwrap(), ItemKind::Folder);
        assert_eq!(ItemKind::File.to_string(), "file");
    }
}
