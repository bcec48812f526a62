//! Operation engine for deskfs.
//!
//! This crate turns user intents (create, delete, rename, move, copy and
//! clipboard paste) into replayable [`Operation`] pairs, applies them
//! atomically to a [`deskfs_core::FsTree`] and keeps an undo/redo
//! [`History`]. [`VirtualFs`] ties the pieces together behind one facade.

mod archive;
mod change;
mod clipboard;
mod conflict;
mod copy;
mod create;
mod delete;
mod executor;
mod move_op;
mod operation;
mod rename;
mod shared;
mod undo;

pub use archive::{
    ArchiveBlob, ArchiveCodec, ArchiveEntry, ArchiveError, ArchiveRequest, archive_stem,
    build_extracted, collect_entries,
};
pub use change::{ChangeKind, FsChange};
pub use clipboard::{Clipboard, ClipboardIntent, ClipboardOp};
pub use conflict::copy_name;
pub use copy::plan_copy;
pub use create::{ItemKind, plan_create, plan_insert};
pub use delete::{plan_delete, top_level};
pub use executor::{FsState, VirtualFs};
pub use move_op::plan_move;
pub use operation::{Operation, Planned};
pub use rename::{plan_rename, validate_name};
pub use shared::SharedFs;
pub use undo::{History, HistoryEntry};

/// Re-exported so codec implementations need no direct dependency.
pub use async_trait::async_trait;
