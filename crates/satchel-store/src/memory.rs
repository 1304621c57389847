//! In-memory chunk store.
//!
//! Intended for tests and embedding. Objects are held in memory behind
//! `RwLock`s for safe concurrent access and cloned on read. Staged writes
//! live in a separate map until committed, matching the visibility rules of
//! the filesystem backend.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use satchel_core::{Error, ObjectMeta, Result, StoreOp};
use uuid::Uuid;

use crate::ChunkStore;

#[derive(Clone)]
struct StagedObject {
    meta: ObjectMeta,
    chunks: Vec<Vec<u8>>,
}

/// Chunk store backed by process memory.
pub struct MemoryChunkStore {
    staging: RwLock<HashMap<Uuid, StagedObject>>,
    committed: RwLock<HashMap<Uuid, StagedObject>>,
}

impl MemoryChunkStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            staging: RwLock::new(HashMap::new()),
            committed: RwLock::new(HashMap::new()),
        }
    }

    /// Number of committed objects currently stored.
    pub fn len(&self) -> usize {
        self.committed.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no objects have been committed.
    pub fn is_empty(&self) -> bool {
        self.committed.read().expect("lock poisoned").is_empty()
    }

    /// Total payload bytes across all committed objects.
    pub fn total_bytes(&self) -> u64 {
        self.committed
            .read()
            .expect("lock poisoned")
            .values()
            .flat_map(|obj| obj.chunks.iter())
            .map(|chunk| chunk.len() as u64)
            .sum()
    }

    /// Remove all objects, committed and staged.
    pub fn clear(&self) {
        self.staging.write().expect("lock poisoned").clear();
        self.committed.write().expect("lock poisoned").clear();
    }

    fn no_session(op: StoreOp) -> Error {
        Error::store(
            op,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no open write session"),
        )
    }
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn begin_write(&self, key: Uuid, meta: &ObjectMeta) -> Result<()> {
        let mut staging = self.staging.write().expect("lock poisoned");
        // A stale session from an abandoned write is simply replaced.
        staging.insert(
            key,
            StagedObject {
                meta: meta.clone(),
                chunks: Vec::new(),
            },
        );
        Ok(())
    }

    async fn write_chunk(&self, key: Uuid, index: u32, data: &[u8]) -> Result<()> {
        let mut staging = self.staging.write().expect("lock poisoned");
        let staged = staging
            .get_mut(&key)
            .ok_or_else(|| Self::no_session(StoreOp::Write))?;

        let idx = index as usize;
        if idx >= staged.chunks.len() {
            staged.chunks.resize_with(idx + 1, Vec::new);
        }
        staged.chunks[idx] = data.to_vec();
        Ok(())
    }

    async fn commit_write(&self, key: Uuid) -> Result<()> {
        let staged = self
            .staging
            .write()
            .expect("lock poisoned")
            .remove(&key)
            .ok_or_else(|| Self::no_session(StoreOp::Close))?;
        self.committed
            .write()
            .expect("lock poisoned")
            .insert(key, staged);
        Ok(())
    }

    async fn read_meta(&self, key: Uuid) -> Result<ObjectMeta> {
        self.committed
            .read()
            .expect("lock poisoned")
            .get(&key)
            .map(|obj| obj.meta.clone())
            .ok_or_else(|| Error::NotFound(format!("object {}", key)))
    }

    async fn chunk_count(&self, key: Uuid) -> Result<u32> {
        self.committed
            .read()
            .expect("lock poisoned")
            .get(&key)
            .map(|obj| obj.chunks.len() as u32)
            .ok_or_else(|| Error::NotFound(format!("object {}", key)))
    }

    async fn read_chunk(&self, key: Uuid, index: u32) -> Result<Vec<u8>> {
        let committed = self.committed.read().expect("lock poisoned");
        let obj = committed
            .get(&key)
            .ok_or_else(|| Error::NotFound(format!("object {}", key)))?;
        obj.chunks.get(index as usize).cloned().ok_or_else(|| {
            Error::store(
                StoreOp::Read,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("chunk {} out of range", index),
                ),
            )
        })
    }

    async fn unlink(&self, key: Uuid) -> Result<()> {
        self.staging.write().expect("lock poisoned").remove(&key);
        self.committed
            .write()
            .expect("lock poisoned")
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("object {}", key)))
    }

    async fn exists(&self, key: Uuid) -> Result<bool> {
        Ok(self
            .committed
            .read()
            .expect("lock poisoned")
            .contains_key(&key))
    }
}

impl std::fmt::Debug for MemoryChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("MemoryChunkStore")
            .field("object_count", &count)
            .finish()
    }
}
