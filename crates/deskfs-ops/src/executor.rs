//! The virtual file system facade.
//!
//! [`VirtualFs`] owns the tree, the clipboard, the history and the selection,
//! and is the only thing hosts mutate. Every public mutation runs to
//! completion (validate, apply, record) before returning, and either fully
//! succeeds or leaves all state untouched.

use compact_str::CompactString;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use deskfs_core::{
    CollisionPolicy, Content, EngineConfig, FsError, FsResult, FsTree, Node, NodeId, TreeStats,
};
use deskfs_query::ListOptions;

use crate::archive::{
    ArchiveCodec, ArchiveRequest, archive_stem, build_extracted, collect_entries,
};
use crate::change::{ChangeKind, FsChange};
use crate::clipboard::{Clipboard, ClipboardOp};
use crate::copy::plan_copy;
use crate::create::{ItemKind, plan_create, plan_insert};
use crate::delete::{plan_delete, top_level};
use crate::move_op::plan_move;
use crate::operation::Planned;
use crate::rename::{plan_rename, validate_name};
use crate::undo::{History, HistoryEntry};

/// Everything a host needs to persist, as plain data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FsState {
    pub tree: FsTree,
    #[serde(default)]
    pub clipboard: Clipboard,
    #[serde(default)]
    pub history: History,
    #[serde(default)]
    pub selection: IndexSet<NodeId>,
}

/// An in-memory file system with clipboard and undo/redo.
#[derive(Debug)]
pub struct VirtualFs {
    tree: FsTree,
    clipboard: Clipboard,
    history: History,
    selection: IndexSet<NodeId>,
    config: EngineConfig,
    revision: u64,
    changes: watch::Sender<FsChange>,
}

impl Default for VirtualFs {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl VirtualFs {
    /// Create a fresh file system.
    pub fn new(config: EngineConfig) -> Self {
        let tree = if config.default_layout {
            FsTree::with_default_layout()
        } else {
            FsTree::new()
        };
        let state = FsState {
            tree,
            history: History::new(config.history_limit),
            ..FsState::default()
        };
        Self::assemble(state, config, "Created file system")
    }

    /// Restore a file system from a saved state.
    ///
    /// The tree is re-validated; stale clipboard and selection ids are
    /// dropped.
    pub fn from_state(mut state: FsState, config: EngineConfig) -> FsResult<Self> {
        state.tree.check_integrity()?;
        state.history.set_limit(config.history_limit);
        state.clipboard.prune(&state.tree);
        state.selection.retain(|id| state.tree.contains(*id));
        tracing::debug!(
            nodes = state.tree.node_count(),
            history = state.history.len(),
            "restored file system"
        );
        Ok(Self::assemble(state, config, "Loaded file system"))
    }

    fn assemble(state: FsState, config: EngineConfig, description: &str) -> Self {
        let (changes, _) = watch::channel(FsChange::new(0, ChangeKind::Loaded, description));
        Self {
            tree: state.tree,
            clipboard: state.clipboard,
            history: state.history,
            selection: state.selection,
            config,
            revision: 0,
            changes,
        }
    }

    /// A copy of the persistable state.
    pub fn to_state(&self) -> FsState {
        FsState {
            tree: self.tree.clone(),
            clipboard: self.clipboard.clone(),
            history: self.history.clone(),
            selection: self.selection.clone(),
        }
    }

    pub fn into_state(self) -> FsState {
        FsState {
            tree: self.tree,
            clipboard: self.clipboard,
            history: self.history,
            selection: self.selection,
        }
    }

    pub fn tree(&self) -> &FsTree {
        &self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Number of changes since construction.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Receive a notification after every change.
    pub fn subscribe(&self) -> watch::Receiver<FsChange> {
        self.changes.subscribe()
    }

    pub fn stats(&self) -> TreeStats {
        self.tree.stats()
    }

    // ==================== Operations ====================

    /// Create an empty file or folder under the folder at `parent_path`.
    ///
    /// A taken name is auto-suffixed. Returns the new node's id.
    pub fn create_item(
        &mut self,
        kind: ItemKind,
        name: &str,
        parent_path: &[NodeId],
    ) -> FsResult<NodeId> {
        self.create(kind, name, parent_path, None)
    }

    /// Create a file with content under the folder at `parent_path`.
    pub fn create_file(
        &mut self,
        name: &str,
        parent_path: &[NodeId],
        content: Content,
    ) -> FsResult<NodeId> {
        self.create(ItemKind::File, name, parent_path, Some(content))
    }

    fn create(
        &mut self,
        kind: ItemKind,
        name: &str,
        parent_path: &[NodeId],
        content: Option<Content>,
    ) -> FsResult<NodeId> {
        let parent = self.resolve_folder_id(parent_path)?;
        self.create_in(kind, name, parent, content)
    }

    fn create_in(
        &mut self,
        kind: ItemKind,
        name: &str,
        parent: NodeId,
        content: Option<Content>,
    ) -> FsResult<NodeId> {
        let planned = plan_create(
            &mut self.tree,
            parent,
            name,
            kind,
            content,
            self.config.max_name_len,
        )?;
        self.apply(planned)
    }

    /// Delete the node at `path` and everything below it.
    pub fn delete_item(&mut self, path: &[NodeId]) -> FsResult<()> {
        let target = self.resolve_id(path)?;
        let planned = plan_delete(&self.tree, target)?;
        self.apply(planned)?;
        Ok(())
    }

    /// Delete several nodes as one undoable unit. Returns how many top-level
    /// items were deleted.
    pub fn delete_items<P: AsRef<[NodeId]>>(&mut self, paths: &[P]) -> FsResult<usize> {
        let ids = top_level(&self.tree, &self.resolve_all(paths)?);
        let description = format!("Deleted {} items", ids.len());
        let (targets, planned) =
            self.transaction(&ids, description, |tree, id| plan_delete(tree, id))?;
        if let Some(planned) = planned {
            self.commit(planned);
        }
        Ok(targets.len())
    }

    /// Rename the node at `path`, failing if a sibling has `new_name`.
    ///
    /// Returns the node's name afterwards.
    pub fn rename_item(&mut self, path: &[NodeId], new_name: &str) -> FsResult<CompactString> {
        self.rename_item_with(path, new_name, CollisionPolicy::Reject)
    }

    /// Rename with an explicit collision policy.
    pub fn rename_item_with(
        &mut self,
        path: &[NodeId],
        new_name: &str,
        policy: CollisionPolicy,
    ) -> FsResult<CompactString> {
        let target = self.resolve_id(path)?;
        let planned = plan_rename(&self.tree, target, new_name, policy, self.config.max_name_len)?;
        self.apply(planned)?;
        Ok(self.tree.node(target)?.name.clone())
    }

    /// Move the node at `source_path` into the folder at `target_path`.
    ///
    /// A taken name is auto-suffixed in the destination. Moving a node into
    /// the folder it already lives in keeps its place and is still recorded.
    pub fn move_item(&mut self, source_path: &[NodeId], target_path: &[NodeId]) -> FsResult<()> {
        let source = self.resolve_id(source_path)?;
        let target = self.resolve_id(target_path)?;
        let planned = plan_move(&self.tree, source, target, self.config.max_name_len)?;
        self.apply(planned)?;
        Ok(())
    }

    /// Move several nodes as one undoable unit.
    pub fn move_items<P: AsRef<[NodeId]>>(
        &mut self,
        paths: &[P],
        target_path: &[NodeId],
    ) -> FsResult<usize> {
        let ids = top_level(&self.tree, &self.resolve_all(paths)?);
        let target = self.resolve_id(target_path)?;
        let description = format!("Moved {} items", ids.len());
        let max_len = self.config.max_name_len;
        let (targets, planned) = self.transaction(&ids, description, |tree, id| {
            plan_move(tree, id, target, max_len)
        })?;
        if let Some(planned) = planned {
            self.commit(planned);
        }
        Ok(targets.len())
    }

    /// Deep-copy the node at `source_path` into the folder at `target_path`.
    ///
    /// Returns the id of the copy.
    pub fn copy_item(&mut self, source_path: &[NodeId], target_path: &[NodeId]) -> FsResult<NodeId> {
        let source = self.resolve_id(source_path)?;
        let target = self.resolve_id(target_path)?;
        let planned = plan_copy(
            &mut self.tree,
            source,
            target,
            &self.config.copy_suffix,
            self.config.max_name_len,
        )?;
        self.apply(planned)
    }

    /// Copy several nodes as one undoable unit. Returns the ids of the copies.
    ///
    /// Every item is copied on its own, even one nested under another
    /// selected item. Duplicate paths are copied once.
    pub fn copy_items<P: AsRef<[NodeId]>>(
        &mut self,
        paths: &[P],
        target_path: &[NodeId],
    ) -> FsResult<Vec<NodeId>> {
        let ids: Vec<NodeId> = self
            .resolve_all(paths)?
            .into_iter()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        let target = self.resolve_id(target_path)?;
        let description = format!("Copied {} items", ids.len());
        self.copy_into(&ids, target, description)
    }

    fn copy_into(
        &mut self,
        ids: &[NodeId],
        target: NodeId,
        description: String,
    ) -> FsResult<Vec<NodeId>> {
        let suffix = self.config.copy_suffix.clone();
        let max_len = self.config.max_name_len;
        let (targets, planned) = self.transaction(ids, description, |tree, id| {
            plan_copy(tree, id, target, &suffix, max_len)
        })?;
        if let Some(planned) = planned {
            self.commit(planned);
        }
        Ok(targets)
    }

    // ==================== Clipboard ====================

    /// Put the nodes at `paths` on the clipboard for copying.
    pub fn copy_to_clipboard<P: AsRef<[NodeId]>>(&mut self, paths: &[P]) -> FsResult<()> {
        self.set_clipboard(ClipboardOp::Copy, paths)
    }

    /// Put the nodes at `paths` on the clipboard for moving.
    pub fn cut_to_clipboard<P: AsRef<[NodeId]>>(&mut self, paths: &[P]) -> FsResult<()> {
        self.set_clipboard(ClipboardOp::Cut, paths)
    }

    fn set_clipboard<P: AsRef<[NodeId]>>(&mut self, op: ClipboardOp, paths: &[P]) -> FsResult<()> {
        let ids = self.resolve_all(paths)?;
        if ids.contains(&self.tree.root_id()) {
            return Err(FsError::RootImmutable);
        }
        let count = ids.len();
        self.clipboard.set_intent(op, ids);
        self.notify(ChangeKind::Clipboard, format!("Clipboard: {op} {count} items"));
        Ok(())
    }

    /// True if a paste would do something.
    pub fn can_paste(&self) -> bool {
        self.clipboard.can_paste(&self.tree)
    }

    /// Paste the clipboard into the folder at `target_path`.
    ///
    /// Items deleted since they were put on the clipboard are skipped. A copy
    /// intent stays on the clipboard; a cut intent is cleared once the paste
    /// succeeds. The whole paste is one undoable unit and on failure nothing
    /// changes, clipboard included. Returns the ids of the pasted nodes.
    pub fn paste_from_clipboard(&mut self, target_path: &[NodeId]) -> FsResult<Vec<NodeId>> {
        let target = self.resolve_folder_id(target_path)?;
        let Some(op) = self.clipboard.operation() else {
            return Err(FsError::NothingToPaste);
        };

        let live = self.clipboard.live_ids(&self.tree);
        let stale = self
            .clipboard
            .intent()
            .map_or(0, |i| i.node_ids.len() - live.len());
        if stale > 0 {
            tracing::warn!(stale, "skipping clipboard items that no longer exist");
        }
        if live.is_empty() {
            return Err(FsError::NothingToPaste);
        }

        let folder = self.tree.node(target)?.name.clone();
        match op {
            ClipboardOp::Copy => {
                let description = format!("Pasted {} items into '{folder}'", live.len());
                self.copy_into(&live, target, description)
            }
            ClipboardOp::Cut => {
                // Nested items travel with their moved ancestor.
                let ids = top_level(&self.tree, &live);
                let description = format!("Pasted {} items into '{folder}'", ids.len());
                let max_len = self.config.max_name_len;
                let (_, planned) = self.transaction(&ids, description, |tree, id| {
                    plan_move(tree, id, target, max_len)
                })?;
                self.clipboard.clear();
                match planned {
                    Some(planned) => {
                        self.commit(planned);
                    }
                    None => self.notify(ChangeKind::Clipboard, "Cleared clipboard"),
                }
                Ok(ids)
            }
        }
    }

    // ==================== History ====================

    /// Undo the most recent operation. Returns its description.
    ///
    /// If the inverse cannot be replayed, fails with
    /// [`FsError::HistoryReplayFailed`], leaves the tree and both stacks
    /// untouched, and disables history until [`VirtualFs::flush_history`].
    pub fn undo_last_operation(&mut self) -> FsResult<String> {
        let description = self.history.undo(&mut self.tree)?;
        self.notify(ChangeKind::Undo, format!("Undid: {description}"));
        Ok(description)
    }

    /// Redo the most recently undone operation. Returns its description.
    pub fn redo_last_operation(&mut self) -> FsResult<String> {
        let description = self.history.redo(&mut self.tree)?;
        self.notify(ChangeKind::Redo, format!("Redid: {description}"));
        Ok(description)
    }

    /// Undoable operations, oldest first.
    pub fn operations(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.history.entries()
    }

    /// Redoable operations, the next one to redo last.
    pub fn redo_operations(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.history.redo_entries()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Drop all history and re-enable undo/redo after a replay failure.
    pub fn flush_history(&mut self) {
        self.history.flush();
        self.notify(ChangeKind::HistoryFlushed, "Flushed history");
    }

    // ==================== Queries ====================

    /// List a folder. See [`deskfs_query::list`].
    pub fn list(&self, folder_path: &[NodeId], options: &ListOptions) -> FsResult<Vec<Node>> {
        deskfs_query::list(&self.tree, folder_path, options)
    }

    /// Search a folder's whole subtree by name.
    pub fn search(&self, folder_path: &[NodeId], query: &str) -> FsResult<Vec<Node>> {
        deskfs_query::search(&self.tree, folder_path, query)
    }

    // ==================== Selection ====================

    /// Replace the selection with the nodes at `paths`.
    pub fn select<P: AsRef<[NodeId]>>(&mut self, paths: &[P]) -> FsResult<()> {
        let ids = self.resolve_all(paths)?;
        self.selection = ids.into_iter().collect();
        let count = self.selection.len();
        self.notify(ChangeKind::Selection, format!("Selected {count} items"));
        Ok(())
    }

    pub fn selection(&self) -> &IndexSet<NodeId> {
        &self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.notify(ChangeKind::Selection, "Cleared selection");
    }

    // ==================== Archives ====================

    /// Compress the nodes at `paths` through `codec` and store the result as
    /// a new file named `archive_name` in the folder at `target_path`.
    pub async fn compress_items<C, P>(
        &mut self,
        codec: &C,
        paths: &[P],
        target_path: &[NodeId],
        archive_name: &str,
    ) -> FsResult<NodeId>
    where
        C: ArchiveCodec + ?Sized,
        P: AsRef<[NodeId]> + Sync,
    {
        let ids = top_level(&self.tree, &self.resolve_all(paths)?);
        if ids.is_empty() {
            return Err(FsError::Archive {
                message: "nothing to compress".into(),
            });
        }
        let target = self.resolve_folder_id(target_path)?;
        validate_name(archive_name, self.config.max_name_len)?;

        let request = ArchiveRequest {
            name: archive_name.to_string(),
            entries: collect_entries(&self.tree, &ids)?,
        };
        tracing::debug!(items = ids.len(), name = archive_name, "compressing");
        let blob = codec.compress(request).await?;

        let content = Content::Reference {
            uri: blob.uri,
            size: blob.size,
        };
        self.create_in(ItemKind::File, archive_name, target, Some(content))
    }

    /// Extract the archive file at `archive_path` through `codec` into a new
    /// folder inside the folder at `target_path`.
    ///
    /// The folder is named after the archive without its extension and the
    /// whole extraction is one undoable unit. Returns the folder's id.
    pub async fn extract_archive<C>(
        &mut self,
        codec: &C,
        archive_path: &[NodeId],
        target_path: &[NodeId],
    ) -> FsResult<NodeId>
    where
        C: ArchiveCodec + ?Sized,
    {
        let archive = self.tree.resolve(archive_path)?;
        let name = archive.name.clone();
        let content = archive.content().cloned().ok_or_else(|| FsError::Archive {
            message: format!("'{name}' has no content to extract"),
        })?;
        let target = self.resolve_folder_id(target_path)?;

        tracing::debug!(archive = %name, "extracting");
        let entries = codec.extract(&content).await?;
        let count = entries.len();

        let subtree = build_extracted(
            &mut self.tree,
            archive_stem(&name),
            entries,
            self.config.max_name_len,
        )?;
        let planned = plan_insert(
            &self.tree,
            target,
            subtree,
            self.config.max_name_len,
            format!("Extracted '{name}' ({count} entries)"),
        )?;
        self.apply(planned)
    }

    // ==================== Internals ====================

    fn resolve_id(&self, path: &[NodeId]) -> FsResult<NodeId> {
        Ok(self.tree.resolve(path)?.id)
    }

    fn resolve_folder_id(&self, path: &[NodeId]) -> FsResult<NodeId> {
        Ok(self.tree.resolve_folder(path)?.id)
    }

    fn resolve_all<P: AsRef<[NodeId]>>(&self, paths: &[P]) -> FsResult<Vec<NodeId>> {
        paths.iter().map(|p| self.resolve_id(p.as_ref())).collect()
    }

    /// Apply a planned operation and record it.
    fn apply(&mut self, planned: Planned) -> FsResult<NodeId> {
        planned.forward.apply(&mut self.tree)?;
        Ok(self.commit(planned))
    }

    /// Plan and apply one step per id as a single unit.
    ///
    /// On failure the tree is restored. Returns the target of every applied
    /// step and the combined entry, which is `None` only for an empty `ids`.
    fn transaction<F>(
        &mut self,
        ids: &[NodeId],
        description: String,
        mut plan: F,
    ) -> FsResult<(Vec<NodeId>, Option<Planned>)>
    where
        F: FnMut(&mut FsTree, NodeId) -> FsResult<Planned>,
    {
        let backup = self.tree.clone();
        match run_steps(&mut self.tree, ids, &mut plan) {
            Ok(steps) => {
                let targets = steps.iter().map(|s| s.target).collect();
                Ok((targets, Planned::combine(steps, description)))
            }
            Err(e) => {
                tracing::debug!(error = %e, "rolling back multi-item operation");
                self.tree = backup;
                Err(e)
            }
        }
    }

    /// Record an applied operation and notify subscribers.
    fn commit(&mut self, planned: Planned) -> NodeId {
        let target = planned.target;
        let description = planned.description.clone();
        tracing::debug!(
            op = planned.forward.label(),
            steps = planned.forward.len(),
            %description,
            "applied operation"
        );
        self.history.record(planned);
        self.notify(ChangeKind::Operation, description);
        target
    }

    /// Drop stale references, bump the revision and notify subscribers.
    fn notify(&mut self, kind: ChangeKind, description: impl Into<String>) {
        let dropped = self.clipboard.prune(&self.tree);
        if dropped > 0 {
            tracing::debug!(dropped, "dropped stale clipboard ids");
        }
        self.selection.retain(|id| self.tree.contains(*id));

        self.revision += 1;
        self.changes
            .send_replace(FsChange::new(self.revision, kind, description));
    }
}

fn run_steps<F>(tree: &mut FsTree, ids: &[NodeId], plan: &mut F) -> FsResult<Vec<Planned>>
where
    F: FnMut(&mut FsTree, NodeId) -> FsResult<Planned>,
{
    let mut steps = Vec::with_capacity(ids.len());
    for &id in ids {
        let step = plan(tree, id)?;
        step.forward.apply(tree)?;
        steps.push(step);
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs() -> VirtualFs {
        VirtualFs::new(
            EngineConfig::builder()
                .default_layout(false)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_default_layout() {
        let fs = VirtualFs::default();
        assert_eq!(fs.tree().root().child_count(), 6);
        assert!(fs.tree().resolve_names("Desktop").is_ok());
    }

    #[test]
    fn test_revision_and_notification() {
        let mut fs = fs();
        let rx = fs.subscribe();
        fs.create_item(ItemKind::Folder, "a", &[]).unwrap();

        assert_eq!(fs.revision(), 1);
        let change = rx.borrow().clone();
        assert_eq!(change.kind, ChangeKind::Operation);
        assert_eq!(change.revision, 1);
    }

    #[test]
    fn test_failed_operation_does_not_notify() {
        let mut fs = fs();
        let err = fs.create_item(ItemKind::Folder, "", &[]).unwrap_err();
        assert!(matches!(err, FsError::InvalidName { .. }));
        assert_eq!(fs.revision(), 0);
        assert!(!fs.can_undo());
    }

    #[test]
    fn test_selection_pruned_after_delete() {
        let mut fs = fs();
        let a = fs.create_item(ItemKind::Folder, "a", &[]).unwrap();
        let b = fs.create_item(ItemKind::Folder, "b", &[]).unwrap();
        fs.select(&[vec![a], vec![b]]).unwrap();

        fs.delete_item(&[a]).unwrap();
        assert_eq!(fs.selection().iter().copied().collect::<Vec<_>>(), [b]);
    }

    #[test]
    fn test_state_round_trip() {
        let mut fs = fs();
        let a = fs.create_item(ItemKind::Folder, "a", &[]).unwrap();
        fs.copy_to_clipboard(&[vec![a]]).unwrap();

        let state = fs.to_state();
        let restored = VirtualFs::from_state(state, EngineConfig::default()).unwrap();
        assert!(restored.can_paste());
        assert_eq!(restored.operations().count(), 1);
        assert!(restored.tree().contains(a));
    }

    #[test]
    fn test_clipboard_rejects_root() {
        let mut fs = fs();
        let root = fs.tree().root_id();
        assert_eq!(
            fs.copy_to_clipboard(&[vec![root]]).unwrap_err(),
            FsError::RootImmutable
        );
    }
}
