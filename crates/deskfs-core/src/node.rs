//! File and folder node types.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a node within a tree.
///
/// Ids are allocated from a monotonically increasing counter and are never
/// reused, so an id captured in history keeps meaning the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new NodeId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Creation and modification times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// When the node was created.
    pub created: DateTime<Utc>,
    /// Last modification of the node (rename, move, child added or removed).
    pub modified: DateTime<Utc>,
}

impl Timestamps {
    /// Timestamps for a node created right now.
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            modified: now,
        }
    }

    /// Bump the modification time.
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }
}

/// Advisory permission flags. The engine stores them but never enforces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            read: true,
            write: true,
            execute: false,
        }
    }
}

impl Permissions {
    /// Default flags for a folder (traversable).
    pub fn folder() -> Self {
        Self {
            execute: true,
            ..Self::default()
        }
    }
}

/// Display hint for files. Has no structural meaning.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
    Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Archive,
    #[default]
    Other,
}

impl FileType {
    /// Guess a display hint from a file name's extension.
    pub fn from_name(name: &str) -> Self {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return Self::Other;
        };

        match ext.to_ascii_lowercase().as_str() {
            "txt" | "md" | "json" | "rs" | "js" | "ts" | "html" | "css" | "csv" | "log"
            | "toml" | "yaml" | "yml" => Self::Text,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "bmp" => Self::Image,
            "mp4" | "webm" | "mov" | "mkv" | "avi" => Self::Video,
            "mp3" | "wav" | "ogg" | "flac" | "m4a" => Self::Audio,
            "pdf" | "doc" | "docx" | "odt" | "xls" | "xlsx" | "ppt" | "pptx" => Self::Document,
            "zip" | "tar" | "gz" | "tgz" | "7z" | "rar" => Self::Archive,
            _ => Self::Other,
        }
    }
}

/// Opaque file payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
    /// Inline text; its size is the byte length.
    Text(String),
    /// Reference to binary data held elsewhere (URL, blob handle).
    Reference { uri: String, size: u64 },
}

impl Content {
    /// Size in bytes reported for a file holding this content.
    pub fn size(&self) -> u64 {
        match self {
            Self::Text(text) => text.len() as u64,
            Self::Reference { size, .. } => *size,
        }
    }
}

/// Type of node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    /// Folder with ordered child ids.
    Folder { children: Vec<NodeId> },
    /// File with an optional payload.
    File {
        file_type: FileType,
        content: Option<Content>,
    },
}

impl NodeKind {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self, NodeKind::Folder { .. })
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File { .. })
    }
}

/// A single file or folder in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node.
    pub id: NodeId,

    /// Owning folder; `None` only for the root.
    pub parent: Option<NodeId>,

    /// Display name, unique among siblings.
    pub name: CompactString,

    /// Node type and associated data.
    pub kind: NodeKind,

    /// Size in bytes. Always 0 for folders.
    pub size: u64,

    pub timestamps: Timestamps,

    pub permissions: Permissions,
}

impl Node {
    /// Create a detached folder node.
    pub fn new_folder(id: NodeId, name: impl Into<CompactString>) -> Self {
        Self {
            id,
            parent: None,
            name: name.into(),
            kind: NodeKind::Folder {
                children: Vec::new(),
            },
            size: 0,
            timestamps: Timestamps::now(),
            permissions: Permissions::folder(),
        }
    }

    /// Create a detached file node. The type hint is taken from the name.
    pub fn new_file(id: NodeId, name: impl Into<CompactString>, content: Option<Content>) -> Self {
        let name = name.into();
        let size = content.as_ref().map_or(0, Content::size);
        Self {
            id,
            parent: None,
            kind: NodeKind::File {
                file_type: FileType::from_name(&name),
                content,
            },
            name,
            size,
            timestamps: Timestamps::now(),
            permissions: Permissions::default(),
        }
    }

    /// Check if this node is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Check if this node is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Child ids; empty for files.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Folder { children } => children,
            NodeKind::File { .. } => &[],
        }
    }

    /// Get the number of direct children.
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// File type hint, if this is a file.
    pub fn file_type(&self) -> Option<FileType> {
        match &self.kind {
            NodeKind::File { file_type, .. } => Some(*file_type),
            NodeKind::Folder { .. } => None,
        }
    }

    /// File payload, if any.
    pub fn content(&self) -> Option<&Content> {
        match &self.kind {
            NodeKind::File { content, .. } => content.as_ref(),
            NodeKind::Folder { .. } => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.kind {
            NodeKind::Folder { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }
}
