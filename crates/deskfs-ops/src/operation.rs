//! Replayable tree operations.

use serde::{Deserialize, Serialize};

use deskfs_core::{CollisionPolicy, FsResult, FsTree, NodeId, Subtree};

/// A concrete, fully-resolved tree mutation.
///
/// Operations carry everything needed to replay them, including exact ids and
/// final names, so applying the same operation twice against the same tree
/// state always has the same effect. Every name is applied strictly: a
/// collision at replay time fails instead of picking another name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Insert a subtree (a single new node, a copy clone or a restored
    /// delete snapshot) under `parent`.
    Create {
        parent: NodeId,
        /// Sibling position; `None` appends.
        index: Option<usize>,
        subtree: Subtree,
    },
    /// Remove a node and all its descendants.
    Delete { target: NodeId },
    /// Give a node a new name in place.
    Rename { target: NodeId, name: String },
    /// Put a node under `parent` with `name`.
    Move {
        target: NodeId,
        parent: NodeId,
        index: Option<usize>,
        name: String,
    },
    /// Several operations applied as one unit.
    Batch { ops: Vec<Operation> },
}

impl Operation {
    /// Apply this operation to the tree.
    ///
    /// On failure the tree is left exactly as it was, batches included.
    pub fn apply(&self, tree: &mut FsTree) -> FsResult<()> {
        match self {
            Self::Create {
                parent,
                index,
                subtree,
            } => {
                tree.insert_subtree(subtree.clone(), *parent, *index, CollisionPolicy::Reject)?;
            }
            Self::Delete { target } => {
                tree.remove(*target)?;
            }
            Self::Rename { target, name } => {
                tree.rename(*target, name, CollisionPolicy::Reject)?;
            }
            Self::Move {
                target,
                parent,
                index,
                name,
            } => {
                tree.reparent_as(*target, *parent, *index, name, CollisionPolicy::Reject)?;
            }
            Self::Batch { ops } => {
                let backup = tree.clone();
                for op in ops {
                    if let Err(e) = op.apply(tree) {
                        *tree = backup;
                        return Err(e);
                    }
                }
            }
        }
        tracing::trace!(op = self.label(), "applied operation");
        Ok(())
    }

    /// Short name of the variant.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Delete { .. } => "delete",
            Self::Rename { .. } => "rename",
            Self::Move { .. } => "move",
            Self::Batch { .. } => "batch",
        }
    }

    /// Number of leaf operations.
    pub fn len(&self) -> usize {
        match self {
            Self::Batch { ops } => ops.iter().map(Operation::len).sum(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A forward operation paired with the operation that undoes it.
#[derive(Debug, Clone)]
pub struct Planned {
    pub forward: Operation,
    pub inverse: Operation,
    /// Human-readable summary for history.
    pub description: String,
    /// The node the caller cares about (created, clone root, moved node).
    pub target: NodeId,
}

impl Planned {
    /// Combine already-applied steps into one unit.
    ///
    /// The inverse undoes the steps in reverse order.
    pub fn combine(steps: Vec<Planned>, description: impl Into<String>) -> Option<Planned> {
        let description = description.into();
        let target = steps.first()?.target;
        if steps.len() == 1 {
            let mut step = steps.into_iter().next()?;
            step.description = description;
            return Some(step);
        }

        let (forward, mut inverse): (Vec<_>, Vec<_>) =
            steps.into_iter().map(|s| (s.forward, s.inverse)).unzip();
        inverse.reverse();
        Some(Planned {
            forward: Operation::Batch { ops: forward },
            inverse: Operation::Batch { ops: inverse },
            description,
            target,
        })
    }
}
