//! Blob adapter over a chunk store.
//!
//! Callers hand the adapter whole payloads; it splits them into fixed-size
//! chunks on write and reassembles them on read, enriching the metadata bag
//! with length, checksum, and upload time along the way. Metadata reads never
//! touch chunk files, so inspecting an object stays cheap regardless of its
//! payload size.

use std::sync::Arc;

use chrono::Utc;
use satchel_core::{ChunkStore, Error, ObjectMeta, Result, StoreOp};
use tracing::{debug, warn};
use uuid::Uuid;

/// Splits payloads into chunks for storage and reassembles them on read.
pub struct BlobAdapter {
    store: Arc<dyn ChunkStore>,
    chunk_size: usize,
}

impl BlobAdapter {
    /// Create an adapter writing chunks of the given size.
    pub fn new(store: Arc<dyn ChunkStore>, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk size must be non-zero".to_string()));
        }
        Ok(Self { store, chunk_size })
    }

    /// Chunk size used for writes, in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Store a payload under the given key, replacing any previous version.
    ///
    /// The length, checksum, and upload timestamp fields of `meta` are
    /// overwritten from the payload; the enriched bag is returned. An empty
    /// payload commits an object with zero chunks.
    pub async fn put(&self, key: Uuid, mut meta: ObjectMeta, payload: &[u8]) -> Result<ObjectMeta> {
        meta.length = payload.len() as u64;
        meta.checksum = Some(format!("{:x}", md5::compute(payload)));
        meta.uploaded_at = Some(Utc::now());

        self.store.begin_write(key, &meta).await?;
        for (index, chunk) in payload.chunks(self.chunk_size).enumerate() {
            self.store.write_chunk(key, index as u32, chunk).await?;
        }
        self.store.commit_write(key).await?;

        debug!(
            object_key = %key,
            filename = %meta.filename,
            bytes = meta.length,
            "blob stored"
        );
        Ok(meta)
    }

    /// Read a payload and its metadata bag back in full.
    ///
    /// The reassembled payload is verified against the stored length and
    /// checksum; a mismatch is reported as a read failure.
    pub async fn get(&self, key: Uuid) -> Result<(Vec<u8>, ObjectMeta)> {
        let meta = self.store.read_meta(key).await?;
        let count = self.store.chunk_count(key).await?;

        let mut payload = Vec::with_capacity(meta.length as usize);
        for index in 0..count {
            payload.extend_from_slice(&self.store.read_chunk(key, index).await?);
        }

        if payload.len() as u64 != meta.length {
            warn!(
                object_key = %key,
                expected = meta.length,
                actual = payload.len(),
                "blob length mismatch"
            );
            return Err(corrupt(key, "length mismatch"));
        }
        if let Some(expected) = &meta.checksum {
            let actual = format!("{:x}", md5::compute(&payload));
            if &actual != expected {
                warn!(object_key = %key, %expected, %actual, "blob checksum mismatch");
                return Err(corrupt(key, "checksum mismatch"));
            }
        }

        Ok((payload, meta))
    }

    /// Read an object's metadata bag without touching its chunks.
    pub async fn get_meta(&self, key: Uuid) -> Result<ObjectMeta> {
        self.store.read_meta(key).await
    }

    /// Remove an object and all its chunks.
    pub async fn delete(&self, key: Uuid) -> Result<()> {
        self.store.unlink(key).await?;
        debug!(object_key = %key, "blob deleted");
        Ok(())
    }

    /// Whether a committed object exists under the key.
    pub async fn exists(&self, key: Uuid) -> Result<bool> {
        self.store.exists(key).await
    }
}

fn corrupt(key: Uuid, detail: &str) -> Error {
    Error::store(
        StoreOp::Read,
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("object {}: {}", key, detail),
        ),
    )
}

impl std::fmt::Debug for BlobAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobAdapter")
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
