//! A cloneable handle for multi-threaded hosts.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, watch};

use deskfs_core::{FsResult, Node, NodeId};
use deskfs_query::ListOptions;

use crate::change::FsChange;
use crate::executor::VirtualFs;

/// A [`VirtualFs`] behind one read/write lock.
///
/// Tree, clipboard and history sit behind the same lock, so a mutation is
/// never observed half-done. Reads may run concurrently with each other but
/// never with a mutation.
#[derive(Debug, Clone)]
pub struct SharedFs {
    inner: Arc<RwLock<VirtualFs>>,
}

impl SharedFs {
    pub fn new(fs: VirtualFs) -> Self {
        Self {
            inner: Arc::new(RwLock::new(fs)),
        }
    }

    /// Shared access for queries.
    pub async fn read(&self) -> RwLockReadGuard<'_, VirtualFs> {
        self.inner.read().await
    }

    /// Exclusive access for mutations.
    pub async fn write(&self) -> RwLockWriteGuard<'_, VirtualFs> {
        self.inner.write().await
    }

    /// Run a mutation under the write lock.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut VirtualFs) -> R) -> R {
        let mut guard = self.inner.write().await;
        f(&mut guard)
    }

    pub async fn can_paste(&self) -> bool {
        self.inner.read().await.can_paste()
    }

    pub async fn list(&self, folder_path: &[NodeId], options: &ListOptions) -> FsResult<Vec<Node>> {
        self.inner.read().await.list(folder_path, options)
    }

    pub async fn subscribe(&self) -> watch::Receiver<FsChange> {
        self.inner.read().await.subscribe()
    }
}
