//! Core types for deskfs.
//!
//! This crate provides the in-memory tree store that backs the virtual
//! file manager: node types, the id-indexed [`FsTree`] with its structural
//! invariants, path resolution, errors and configuration.

mod config;
mod error;
mod node;
mod path;
mod tree;

pub use config::{
    ConfigError, DEFAULT_COPY_SUFFIX, DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_NAME_LEN, EngineConfig,
    EngineConfigBuilder,
};
pub use error::{FsError, FsResult};
pub use node::{Content, FileType, Node, NodeId, NodeKind, Permissions, Timestamps};
pub use tree::{
    CollisionPolicy, DEFAULT_LAYOUT, FsTree, ROOT_NAME, Subtree, TreeStats, suffixed_name,
};
