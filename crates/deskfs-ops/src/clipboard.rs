//! Clipboard intent holder.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use deskfs_core::{FsTree, NodeId};

/// What a paste will do with the referenced items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardOp {
    /// Paste clones the items and keeps the intent.
    Copy,
    /// Paste moves the items and clears the intent.
    Cut,
}

/// A pending copy or cut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardIntent {
    pub operation: ClipboardOp,
    /// Referenced ids in selection order.
    pub node_ids: IndexSet<NodeId>,
}

/// Holds at most one clipboard intent.
///
/// Ids are validated lazily: an id deleted after the intent was set is
/// simply skipped when pasting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clipboard {
    intent: Option<ClipboardIntent>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any prior intent. An empty id list clears the clipboard.
    pub fn set_intent(&mut self, operation: ClipboardOp, ids: impl IntoIterator<Item = NodeId>) {
        let node_ids: IndexSet<NodeId> = ids.into_iter().collect();
        self.intent = if node_ids.is_empty() {
            None
        } else {
            Some(ClipboardIntent {
                operation,
                node_ids,
            })
        };
    }

    pub fn intent(&self) -> Option<&ClipboardIntent> {
        self.intent.as_ref()
    }

    pub fn operation(&self) -> Option<ClipboardOp> {
        self.intent.as_ref().map(|i| i.operation)
    }

    pub fn clear(&mut self) {
        self.intent = None;
    }

    pub fn is_empty(&self) -> bool {
        self.intent.is_none()
    }

    /// Referenced ids that still resolve to live nodes.
    pub fn live_ids(&self, tree: &FsTree) -> Vec<NodeId> {
        self.intent
            .iter()
            .flat_map(|i| i.node_ids.iter())
            .copied()
            .filter(|id| tree.contains(*id))
            .collect()
    }

    /// True if an intent exists and at least one of its ids is live.
    pub fn can_paste(&self, tree: &FsTree) -> bool {
        self.intent
            .as_ref()
            .is_some_and(|i| i.node_ids.iter().any(|id| tree.contains(*id)))
    }

    /// Forget ids that no longer resolve. Returns how many were dropped.
    pub fn prune(&mut self, tree: &FsTree) -> usize {
        let Some(intent) = self.intent.as_mut() else {
            return 0;
        };
        let before = intent.node_ids.len();
        intent.node_ids.retain(|id| tree.contains(*id));
        let dropped = before - intent.node_ids.len();
        if intent.node_ids.is_empty() {
            self.intent = None;
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_intent_overwrites() {
        let tree = FsTree::with_folders(&["a", "b"]);
        let a = tree.child_by_name(tree.root_id(), "a").unwrap();
        let b = tree.child_by_name(tree.root_id(), "b").unwrap();

        let mut clipboard = Clipboard::new();
        clipboard.set_intent(ClipboardOp::Copy, [a]);
        clipboard.set_intent(ClipboardOp::Cut, [b]);

        let intent = clipboard.intent().unwrap();
        assert_eq!(intent.operation, ClipboardOp::Cut);
        assert_eq!(intent.node_ids.iter().copied().collect::<Vec<_>>(), [b]);
    }

    #[test]
    fn test_can_paste_needs_a_live_id() {
        let tree = FsTree::with_folders(&["a"]);
        let a = tree.child_by_name(tree.root_id(), "a").unwrap();
        let mut clipboard = Clipboard::new();
        assert!(!clipboard.can_paste(&tree));

        clipboard.set_intent(ClipboardOp::Copy, [NodeId::new(77), a]);
        assert!(clipboard.can_paste(&tree));
        assert_eq!(clipboard.live_ids(&tree), [a]);

        clipboard.set_intent(ClipboardOp::Copy, [NodeId::new(77)]);
        assert!(!clipboard.can_paste(&tree));
    }

    #[test]
    fn test_prune_drops_stale_ids() {
        let tree = FsTree::with_folders(&["a"]);
        let a = tree.child_by_name(tree.root_id(), "a").unwrap();
        let mut clipboard = Clipboard::new();

        clipboard.set_intent(ClipboardOp::Cut, [a, NodeId::new(50)]);
        assert_eq!(clipboard.prune(&tree), 1);
        assert!(!clipboard.is_empty());

        clipboard.set_intent(ClipboardOp::Cut, [NodeId::new(50)]);
        clipboard.prune(&tree);
        assert!(clipboard.is_empty());
    }

    #[test]
    fn test_empty_intent_clears() {
        let mut clipboard = Clipboard::new();
        clipboard.set_intent(ClipboardOp::Copy, Vec::new());
        assert!(clipboard.is_empty());
    }
}
