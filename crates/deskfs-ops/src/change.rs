//! Change notifications for hosts that re-render on state changes.

use serde::{Deserialize, Serialize};
use strum::Display;

/// What kind of change happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// The engine was constructed or loaded.
    Loaded,
    /// A new operation was applied and recorded.
    Operation,
    Undo,
    Redo,
    /// The clipboard intent changed.
    Clipboard,
    /// The selection changed.
    Selection,
    /// History was flushed.
    HistoryFlushed,
}

/// A "state changed, re-read" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsChange {
    /// Monotonic counter, bumped on every change.
    pub revision: u64,
    pub kind: ChangeKind,
    /// Human-readable summary.
    pub description: String,
}

impl FsChange {
    pub fn new(revision: u64, kind: ChangeKind, description: impl Into<String>) -> Self {
        Self {
            revision,
            kind,
            description: description.into(),
        }
    }

    /// Whether the tree itself may have changed.
    pub fn touches_tree(&self) -> bool {
        matches!(
            self.kind,
            ChangeKind::Loaded | ChangeKind::Operation | ChangeKind::Undo | ChangeKind::Redo
        )
    }
}

impl std::fmt::Display for FsChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}: {}", self.revision, self.kind, self.description)
    }
}
