//! Naming for copies placed next to existing items.

use compact_str::{CompactString, format_compact};

use deskfs_core::{FsTree, NodeId};

/// Name for a copy of `source_name` placed under `parent`.
///
/// The suffix is always appended; if that name is taken too, the lowest
/// free number is added: "todo.txt - Copy", then "todo.txt - Copy (2)".
pub fn copy_name(tree: &FsTree, parent: NodeId, source_name: &str, suffix: &str) -> CompactString {
    let base = format_compact!("{source_name}{suffix}");
    tree.unique_child_name(parent, &base, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskfs_core::{CollisionPolicy, DEFAULT_COPY_SUFFIX, Node};

    #[test]
    fn test_copy_name_sequence() {
        let mut tree = FsTree::new();
        let root = tree.root_id();
        let mut names = Vec::new();
        for _ in 0..3 {
            let name = copy_name(&tree, root, "todo.txt", DEFAULT_COPY_SUFFIX);
            let id = tree.allocate_id();
            tree.insert(Node::new_file(id, name.clone(), None), root, None, CollisionPolicy::Reject)
                .unwrap();
            names.push(name);
        }
        assert_eq!(
            names,
            ["todo.txt - Copy", "todo.txt - Copy (2)", "todo.txt - Copy (3)"]
        );
    }

    #[test]
    fn test_copy_name_custom_suffix() {
        let tree = FsTree::new();
        assert_eq!(
            copy_name(&tree, tree.root_id(), "report", " (copy)"),
            "report (copy)"
        );
    }
}
