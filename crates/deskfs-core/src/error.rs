//! Error types for tree operations.

use compact_str::CompactString;
use thiserror::Error;

use crate::node::NodeId;

/// Result alias used across deskfs.
pub type FsResult<T> = Result<T, FsError>;

/// Errors that can occur while resolving or mutating the tree.
///
/// Every variant except [`FsError::HistoryReplayFailed`] is detected before
/// any mutation, so the tree is untouched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    /// A path segment or id does not resolve to a live node.
    #[error("Node not found: {id}")]
    NotFound { id: NodeId },

    /// A name-based path does not resolve.
    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    /// A folder was required but the node is a file.
    #[error("Not a folder: {id}")]
    NotAFolder { id: NodeId },

    /// Moving a folder into itself or one of its descendants.
    #[error("Cannot move {source_id} into itself or its descendant {target}")]
    CyclicMove { source_id: NodeId, target: NodeId },

    /// A sibling already has this name and auto-suffixing was not requested.
    #[error("'{name}' already exists in {parent}")]
    NameCollision {
        name: CompactString,
        parent: NodeId,
    },

    /// The name is unusable.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Undo or redo could not be replayed against the live tree.
    #[error("Could not replay '{description}': {source}")]
    HistoryReplayFailed {
        description: String,
        #[source]
        source: Box<FsError>,
    },

    /// The root folder cannot be renamed, moved, copied or deleted.
    #[error("The root folder cannot be modified")]
    RootImmutable,

    /// An inserted node reuses an id that is already live.
    #[error("Id {id} is already in use")]
    DuplicateId { id: NodeId },

    /// Paste was requested but no clipboard item is still resolvable.
    #[error("Nothing to paste")]
    NothingToPaste,

    /// The undo stack is empty.
    #[error("Nothing to undo")]
    NothingToUndo,

    /// The redo stack is empty.
    #[error("Nothing to redo")]
    NothingToRedo,

    /// A previous replay failed; history must be flushed first.
    #[error("History is out of sync with the tree; flush it before undoing again")]
    HistoryDisabled,

    /// The archive collaborator rejected the request.
    #[error("Archive operation failed: {message}")]
    Archive { message: String },

    /// A loaded snapshot violates a structural invariant.
    #[error("Corrupted tree: {message}")]
    Corrupted { message: String },
}

impl FsError {
    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a corrupted tree error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Wrap a replay error, keeping the entry description.
    pub fn replay_failed(description: impl Into<String>, source: FsError) -> Self {
        Self::HistoryReplayFailed {
            description: description.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error means history and tree have drifted apart.
    pub fn is_history_failure(&self) -> bool {
        matches!(self, Self::HistoryReplayFailed { .. })
    }
}
