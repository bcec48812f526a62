//! Undo/redo history of replayable operations.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use deskfs_core::{DEFAULT_HISTORY_LIMIT, FsError, FsResult, FsTree};

use crate::operation::{Operation, Planned};

/// An entry in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique ID for this entry.
    pub id: u64,
    /// When the operation was performed.
    pub timestamp: DateTime<Utc>,
    /// Human-readable description.
    pub description: String,
    /// Replays the operation.
    pub forward: Operation,
    /// Undoes the operation.
    pub inverse: Operation,
}

impl HistoryEntry {
    /// Create a new history entry.
    pub fn new(id: u64, planned: Planned) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            description: planned.description,
            forward: planned.forward,
            inverse: planned.inverse,
        }
    }
}

/// Bounded undo stack with a redo stack.
///
/// Recording a new entry clears the redo stack. When a replay fails, both
/// stacks are left exactly as they were and the history is disabled until
/// [`History::flush`] is called.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    max_entries: usize,
    next_id: u64,
    #[serde(default)]
    disabled: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// Create an empty history keeping at most `max_entries` undo entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo: VecDeque::with_capacity(max_entries.min(1000)),
            redo: Vec::new(),
            max_entries: max_entries.max(1),
            next_id: 0,
            disabled: false,
        }
    }

    /// Record an applied operation.
    ///
    /// Returns the ID assigned to this entry.
    pub fn record(&mut self, planned: Planned) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        self.redo.clear();
        while self.undo.len() >= self.max_entries {
            self.undo.pop_front();
        }
        self.undo.push_back(HistoryEntry::new(id, planned));

        id
    }

    /// Replay the inverse of the most recent entry.
    ///
    /// Returns the description of the undone entry.
    pub fn undo(&mut self, tree: &mut FsTree) -> FsResult<String> {
        self.ensure_enabled()?;
        let entry = self.undo.back().ok_or(FsError::NothingToUndo)?;
        if let Err(e) = entry.inverse.apply(tree) {
            let error = FsError::replay_failed(&entry.description, e);
            return Err(self.disable(error));
        }

        let entry = self.undo.pop_back().ok_or(FsError::NothingToUndo)?;
        tracing::info!(id = entry.id, description = %entry.description, "undid operation");
        let description = entry.description.clone();
        self.redo.push(entry);
        Ok(description)
    }

    /// Replay the forward operation of the most recently undone entry.
    ///
    /// Returns the description of the redone entry.
    pub fn redo(&mut self, tree: &mut FsTree) -> FsResult<String> {
        self.ensure_enabled()?;
        let entry = self.redo.last().ok_or(FsError::NothingToRedo)?;
        if let Err(e) = entry.forward.apply(tree) {
            let error = FsError::replay_failed(&entry.description, e);
            return Err(self.disable(error));
        }

        let entry = self.redo.pop().ok_or(FsError::NothingToRedo)?;
        tracing::info!(id = entry.id, description = %entry.description, "redid operation");
        let description = entry.description.clone();
        self.undo.push_back(entry);
        Ok(description)
    }

    fn ensure_enabled(&self) -> FsResult<()> {
        if self.disabled {
            Err(FsError::HistoryDisabled)
        } else {
            Ok(())
        }
    }

    fn disable(&mut self, error: FsError) -> FsError {
        tracing::warn!(%error, "history replay failed; undo and redo disabled until flushed");
        self.disabled = true;
        error
    }

    /// Drop every entry and re-enable history.
    pub fn flush(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.disabled = false;
    }

    /// Change the maximum depth, dropping the oldest entries if needed.
    pub fn set_limit(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
        while self.undo.len() > self.max_entries {
            self.undo.pop_front();
        }
    }

    pub fn limit(&self) -> usize {
        self.max_entries
    }

    /// Whether a replay failed since the last flush.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn can_undo(&self) -> bool {
        !self.disabled && !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.disabled && !self.redo.is_empty()
    }

    /// Peek at the entry the next undo would replay.
    pub fn peek(&self) -> Option<&HistoryEntry> {
        self.undo.back()
    }

    /// Undo entries, oldest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.undo.iter()
    }

    /// Redo entries, the next one to redo last.
    pub fn redo_entries(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.redo.iter()
    }

    /// Get the number of undo entries.
    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }
}
