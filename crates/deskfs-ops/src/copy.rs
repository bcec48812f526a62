//! Copy planning.

use deskfs_core::{FsError, FsResult, FsTree, NodeId};

use crate::conflict::copy_name;
use crate::create::plan_insert;
use crate::operation::Planned;

/// Plan a deep copy of `source` into the folder `target`.
///
/// The clone gets fresh ids throughout and its top node is named with
/// `suffix` appended. Copying a folder into its own descendant is allowed:
/// the clone is taken before it is inserted.
pub fn plan_copy(
    tree: &mut FsTree,
    source: NodeId,
    target: NodeId,
    suffix: &str,
    max_len: usize,
) -> FsResult<Planned> {
    if source == tree.root_id() {
        return Err(FsError::RootImmutable);
    }
    let source_name = tree.node(source)?.name.clone();
    let destination = tree.folder(target)?.name.clone();

    let mut clone = tree.clone_subtree(source)?;
    clone.set_top_name(copy_name(tree, target, &source_name, suffix));
    plan_insert(
        tree,
        target,
        clone,
        max_len,
        format!("Copied '{source_name}' to '{destination}'"),
    )
}
