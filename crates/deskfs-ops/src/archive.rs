//! Archive collaborator seam.
//!
//! Compression and extraction are done by an external codec. The engine
//! only flattens items into [`ArchiveEntry`] values for the codec and turns
//! what comes back into ordinary create operations.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use deskfs_core::{Content, FsError, FsResult, FsTree, Node, NodeId, NodeKind, Subtree};

use crate::create::ItemKind;
use crate::rename::validate_name;

/// One item inside an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Names from the archived item down to this entry, top item first.
    pub path: Vec<String>,
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
}

/// What the engine asks a codec to compress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRequest {
    /// Name of the archive file that will be created.
    pub name: String,
    /// Entries in pre-order.
    pub entries: Vec<ArchiveEntry>,
}

/// Reference to a compressed blob produced by a codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveBlob {
    pub uri: String,
    pub size: u64,
}

/// Errors reported by an archive codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    #[error("Unsupported archive format: {0}")]
    Unsupported(String),

    #[error("Codec failed: {0}")]
    Codec(String),
}

impl From<ArchiveError> for FsError {
    fn from(error: ArchiveError) -> Self {
        FsError::Archive {
            message: error.to_string(),
        }
    }
}

/// Request/response interface to an external archive service.
#[async_trait]
pub trait ArchiveCodec: Send + Sync {
    /// Compress the given entries into a blob.
    async fn compress(&self, request: ArchiveRequest) -> Result<ArchiveBlob, ArchiveError>;

    /// List the entries stored in an archive's content.
    async fn extract(&self, archive: &Content) -> Result<Vec<ArchiveEntry>, ArchiveError>;
}

/// Flatten the given items and their descendants into archive entries.
pub fn collect_entries(tree: &FsTree, ids: &[NodeId]) -> FsResult<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    for &id in ids {
        let top = tree.node(id)?;
        let mut stack = vec![(id, vec![top.name.to_string()])];
        while let Some((id, path)) = stack.pop() {
            let node = tree.node(id)?;
            for child in node.children().iter().rev() {
                let mut child_path = path.clone();
                child_path.push(tree.node(*child)?.name.to_string());
                stack.push((*child, child_path));
            }
            entries.push(ArchiveEntry {
                path,
                kind: if node.is_folder() {
                    ItemKind::Folder
                } else {
                    ItemKind::File
                },
                content: node.content().cloned(),
            });
        }
    }
    Ok(entries)
}

/// Name of the folder an archive is extracted into: its name without the
/// last extension.
pub fn archive_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}

/// Build a detached folder named `folder_name` holding the given entries.
///
/// Missing intermediate folders are created. Every node gets a fresh id
/// and every name is validated.
pub fn build_extracted(
    tree: &mut FsTree,
    folder_name: &str,
    entries: Vec<ArchiveEntry>,
    max_len: usize,
) -> FsResult<Subtree> {
    validate_name(folder_name, max_len)?;
    let top = tree.allocate_id();
    let mut builder = Builder {
        nodes: vec![Node::new_folder(top, folder_name)],
        index: HashMap::from([(top, 0)]),
        max_len,
    };

    for entry in entries {
        let Some((last, dirs)) = entry.path.split_last() else {
            tracing::warn!("skipping archive entry with an empty path");
            continue;
        };

        let mut parent = top;
        for dir in dirs {
            let existing = builder.child(parent, dir).map(|n| (n.id, n.is_folder()));
            parent = match existing {
                Some((id, true)) => id,
                Some((_, false)) => return Err(conflict(dir)),
                None => builder.add(parent, Node::new_folder(tree.allocate_id(), dir.as_str()))?,
            };
        }

        let existing = builder.child(parent, last).map(Node::is_folder);
        match (entry.kind, existing) {
            (ItemKind::Folder, Some(true)) => {}
            (_, Some(_)) => return Err(conflict(last)),
            (ItemKind::Folder, None) => {
                builder.add(parent, Node::new_folder(tree.allocate_id(), last.as_str()))?;
            }
            (ItemKind::File, None) => {
                let node = Node::new_file(tree.allocate_id(), last.as_str(), entry.content);
                builder.add(parent, node)?;
            }
        }
    }

    builder.finish(top)
}

fn conflict(name: &str) -> FsError {
    FsError::Archive {
        message: format!("archive lists '{name}' more than once"),
    }
}

struct Builder {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    max_len: usize,
}

impl Builder {
    fn get(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|i| &self.nodes[*i])
    }

    fn child(&self, parent: NodeId, name: &str) -> Option<&Node> {
        self.get(parent)?
            .children()
            .iter()
            .filter_map(|c| self.get(*c))
            .find(|n| n.name == name)
    }

    fn add(&mut self, parent: NodeId, mut node: Node) -> FsResult<NodeId> {
        validate_name(&node.name, self.max_len)?;
        let id = node.id;
        node.parent = Some(parent);

        let slot = self.index.get(&parent).copied();
        if let Some(NodeKind::Folder { children }) = slot.map(|i| &mut self.nodes[i].kind) {
            children.push(id);
        }
        self.index.insert(id, self.nodes.len());
        self.nodes.push(node);
        Ok(id)
    }

    /// Reorder into pre-order and validate the shape.
    fn finish(self, top: NodeId) -> FsResult<Subtree> {
        let Self { nodes, index, .. } = self;
        let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(slots.len());
        let mut stack = vec![top];
        while let Some(id) = stack.pop() {
            let Some(node) = index.get(&id).and_then(|i| slots[*i].take()) else {
                continue;
            };
            stack.extend(node.children().iter().rev().copied());
            ordered.push(node);
        }
        Subtree::from_nodes(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskfs_core::{CollisionPolicy, DEFAULT_MAX_NAME_LEN};

    fn entry(path: &[&str], kind: ItemKind) -> ArchiveEntry {
        ArchiveEntry {
            path: path.iter().map(|s| s.to_string()).collect(),
            kind,
            content: match kind {
                ItemKind::File => Some(Content::Text(path.join("/"))),
                ItemKind::Folder => None,
            },
        }
    }

    #[test]
    fn test_archive_stem() {
        assert_eq!(archive_stem("photos.zip"), "photos");
        assert_eq!(archive_stem("backup.tar.gz"), "backup.tar");
        assert_eq!(archive_stem(".hidden"), ".hidden");
        assert_eq!(archive_stem("plain"), "plain");
    }

    #[test]
    fn test_collect_entries_pre_order() {
        let mut tree = FsTree::with_folders(&["Docs"]);
        let docs = tree.child_by_name(tree.root_id(), "Docs").unwrap();
        let sub = tree.allocate_id();
        tree.insert(Node::new_folder(sub, "sub"), docs, None, CollisionPolicy::Reject)
            .unwrap();
        let file = tree.allocate_id();
        tree.insert(
            Node::new_file(file, "a.txt", Some(Content::Text("a".into()))),
            sub,
            None,
            CollisionPolicy::Reject,
        )
        .unwrap();

        let entries = collect_entries(&tree, &[docs]).unwrap();
        let paths: Vec<String> = entries.iter().map(|e| e.path.join("/")).collect();
        assert_eq!(paths, ["Docs", "Docs/sub", "Docs/sub/a.txt"]);
        assert_eq!(entries[2].kind, ItemKind::File);
    }

    #[test]
    fn test_build_extracted_creates_missing_folders() {
        let mut tree = FsTree::new();
        let entries = vec![
            entry(&["Docs", "sub", "a.txt"], ItemKind::File),
            entry(&["Docs", "b.txt"], ItemKind::File),
            entry(&["Docs"], ItemKind::Folder),
        ];
        let subtree = build_extracted(&mut tree, "backup", entries, DEFAULT_MAX_NAME_LEN).unwrap();

        let names: Vec<&str> = subtree.nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["backup", "Docs", "sub", "a.txt", "b.txt"]);

        let root = tree.root_id();
        tree.insert_subtree(subtree, root, None, CollisionPolicy::Reject)
            .unwrap();
        assert!(tree.check_integrity().is_ok());
        assert!(tree.resolve_names("backup/Docs/sub/a.txt").is_ok());
    }

    #[test]
    fn test_build_extracted_rejects_duplicates() {
        let mut tree = FsTree::new();
        let entries = vec![
            entry(&["a.txt"], ItemKind::File),
            entry(&["a.txt"], ItemKind::File),
        ];
        let err = build_extracted(&mut tree, "x", entries, DEFAULT_MAX_NAME_LEN).unwrap_err();
        assert!(matches!(err, FsError::Archive { .. }));
    }

    #[test]
    fn test_build_extracted_validates_names() {
        let mut tree = FsTree::new();
        let entries = vec![entry(&["..", "a.txt"], ItemKind::File)];
        let err = build_extracted(&mut tree, "x", entries, DEFAULT_MAX_NAME_LEN).unwrap_err();
        assert!(matches!(err, FsError::InvalidName { .. }));
    }

    #[test]
    fn test_archive_error_converts() {
        let err: FsError = ArchiveError::Unsupported("rar".into()).into();
        assert_eq!(
            err,
            FsError::Archive {
                message: "Unsupported archive format: rar".into()
            }
        );
    }
}
