//! Content store interface.
//!
//! The indexer never reads the filesystem itself; callers load bytes into
//! a store and hand the indexer a [`FileId`]. The store is read-only from
//! the extraction path. A miss degrades to empty extraction output.

use crate::FileId;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Maps a [`FileId`] to an immutable byte buffer.
pub trait ContentStore: Send + Sync {
    fn get(&self, file_id: FileId) -> Option<Arc<[u8]>>;
}

/// In-memory reference implementation backed by a concurrent map.
#[derive(Default)]
pub struct InMemoryContentStore {
    files: DashMap<FileId, Arc<[u8]>>,
    next_id: AtomicU32,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            files: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    /// Register content and return its new id.
    pub fn insert(&self, content: impl Into<Arc<[u8]>>) -> FileId {
        let id = FileId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
            .expect("file id counter starts at 1");
        self.files.insert(id, content.into());
        id
    }

    /// Register string content and return its new id.
    pub fn insert_str(&self, content: &str) -> FileId {
        self.insert(content.as_bytes().to_vec())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ContentStore for InMemoryContentStore {
    fn get(&self, file_id: FileId) -> Option<Arc<[u8]>> {
        self.files.get(&file_id).map(|entry| Arc::clone(&entry))
    }
}
