//! Rename planning and name validation.

use deskfs_core::{CollisionPolicy, FsError, FsResult, FsTree, NodeId};

use crate::operation::{Operation, Planned};

/// Check that a name can be used for a node.
///
/// Rejects empty or whitespace-only names, path separators, NUL, the
/// reserved `.` and `..`, and names longer than `max_len` bytes.
pub fn validate_name(name: &str, max_len: usize) -> FsResult<()> {
    if name.trim().is_empty() {
        return Err(FsError::invalid_name(name, "name cannot be empty"));
    }

    if name.len() > max_len {
        return Err(FsError::invalid_name(
            name,
            format!("name is too long (max {max_len} bytes)"),
        ));
    }

    for c in ['/', '\\', '\0'] {
        if name.contains(c) {
            return Err(FsError::invalid_name(
                name,
                format!("name cannot contain {c:?}"),
            ));
        }
    }

    if name == "." || name == ".." {
        return Err(FsError::invalid_name(name, "'.' and '..' are reserved"));
    }

    Ok(())
}

/// Plan a rename of `target` to `new_name`.
///
/// Renaming a node to the name it already has plans a rename whose forward
/// and inverse are the same, so it still gets its own history entry.
pub fn plan_rename(
    tree: &FsTree,
    target: NodeId,
    new_name: &str,
    policy: CollisionPolicy,
    max_len: usize,
) -> FsResult<Planned> {
    if target == tree.root_id() {
        return Err(FsError::RootImmutable);
    }
    let node = tree.node(target)?;
    validate_name(new_name, max_len)?;
    let parent = node.parent.ok_or(FsError::RootImmutable)?;

    let name = tree.settle_name(parent, new_name, Some(target), policy)?;
    validate_name(&name, max_len)?;

    Ok(Planned {
        forward: Operation::Rename {
            target,
            name: name.to_string(),
        },
        inverse: Operation::Rename {
            target,
            name: node.name.to_string(),
        },
        description: format!("Renamed '{}' to '{}'", node.name, name),
        target,
    })
}
