//! Filesystem chunk store.
//!
//! Objects live in a fan-out directory hierarchy keyed by attachment
//! identity. Each object is a directory holding its metadata bag and one
//! file per chunk:
//!
//! ```text
//! {base_path}/objects/{hh}/{hh}/{uuid}/
//!     meta.json
//!     000000.chunk
//!     000001.chunk
//! ```
//!
//! Writes are staged in a `.staging` sibling directory and published with a
//! single rename, so readers never observe a half-written object and a
//! crashed write leaves the previous version intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use satchel_core::{Error, ObjectMeta, Result, StoreOp};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ChunkStore;

/// File that marks a committed object and carries its metadata bag.
const META_FILE: &str = "meta.json";

/// Relative directory for an object's chunks and metadata bag.
///
/// Format: `objects/{first-2-hex}/{next-2-hex}/{uuid}`
///
/// Example: `objects/01/94/01948f7e-8b2a-7c3d-9e4f-5a6b7c8d9e0f`
pub fn object_dir(key: &Uuid) -> String {
    let hex = key.simple().to_string();
    format!("objects/{}/{}/{}", &hex[0..2], &hex[2..4], key.as_hyphenated())
}

/// Filename of chunk `index` inside an object directory.
fn chunk_file(index: u32) -> String {
    format!("{:06}.chunk", index)
}

/// Chunk store backed by the local filesystem.
pub struct FilesystemChunkStore {
    base_path: PathBuf,
}

impl FilesystemChunkStore {
    /// Create a new filesystem store rooted at the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn final_dir(&self, key: &Uuid) -> PathBuf {
        self.base_path.join(object_dir(key))
    }

    fn staging_dir(&self, key: &Uuid) -> PathBuf {
        let mut dir = self.final_dir(key).into_os_string();
        dir.push(".staging");
        PathBuf::from(dir)
    }

    /// Validate that the store can write, commit, read, and unlink objects.
    ///
    /// Performs a full round-trip test at startup to catch filesystem issues
    /// (overlayfs quirks, permission errors, missing directories) early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let key = Uuid::now_v7();
        let meta = ObjectMeta::new("health-check.bin", "application/octet-stream");
        let data = b"storage-health-check";

        self.begin_write(key, &meta)
            .await
            .map_err(|e| format!("begin_write: {}", e))?;
        self.write_chunk(key, 0, data)
            .await
            .map_err(|e| format!("write_chunk: {}", e))?;
        self.commit_write(key)
            .await
            .map_err(|e| format!("commit_write: {}", e))?;

        let read_back = self
            .read_chunk(key, 0)
            .await
            .map_err(|e| format!("read_chunk: {}", e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        self.unlink(key).await.map_err(|e| format!("unlink: {}", e))?;
        Ok(())
    }

    // Plain create + write + sync. Durability per file; atomic visibility
    // comes from the staging-directory rename in commit_write.
    async fn write_file(&self, path: &Path, data: &[u8], op: StoreOp) -> Result<()> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "chunk_store: File::create failed");
            Error::store(op, e)
        })?;
        file.write_all(data)
            .await
            .map_err(|e| Error::store(op, e))?;
        file.sync_all().await.map_err(|e| Error::store(op, e))?;
        drop(file);

        // Set permissions to 0644 (rw-r--r--, no execute)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
                .await
                .map_err(|e| Error::store(op, e))?;
        }

        Ok(())
    }
}

#[async_trait]
impl ChunkStore for FilesystemChunkStore {
    async fn begin_write(&self, key: Uuid, meta: &ObjectMeta) -> Result<()> {
        let staging = self.staging_dir(&key);
        debug!(object_key = %key, staging = %staging.display(), "chunk_store: begin_write");

        // Discard a stale session from an earlier crashed write.
        match fs::remove_dir_all(&staging).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::store(StoreOp::Open, e)),
        }

        fs::create_dir_all(&staging).await.map_err(|e| {
            warn!(staging = %staging.display(), error = %e, "chunk_store: create_dir_all failed");
            Error::store(StoreOp::Open, e)
        })?;

        let bag = serde_json::to_vec(meta).map_err(|e| {
            Error::store(
                StoreOp::Open,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        self.write_file(&staging.join(META_FILE), &bag, StoreOp::Open)
            .await
    }

    async fn write_chunk(&self, key: Uuid, index: u32, data: &[u8]) -> Result<()> {
        let path = self.staging_dir(&key).join(chunk_file(index));
        self.write_file(&path, data, StoreOp::Write).await
    }

    async fn commit_write(&self, key: Uuid) -> Result<()> {
        let staging = self.staging_dir(&key);
        let final_dir = self.final_dir(&key);

        // Replace any prior version of the object.
        match fs::remove_dir_all(&final_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::store(StoreOp::Close, e)),
        }

        fs::rename(&staging, &final_dir).await.map_err(|e| {
            warn!(from = %staging.display(), to = %final_dir.display(), error = %e, "chunk_store: commit rename failed");
            Error::store(StoreOp::Close, e)
        })?;

        debug!(object_key = %key, "chunk_store: committed");
        Ok(())
    }

    async fn read_meta(&self, key: Uuid) -> Result<ObjectMeta> {
        let path = self.final_dir(&key).join(META_FILE);
        let bytes = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("object {}", key))
            } else {
                Error::store(StoreOp::Read, e)
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            Error::store(
                StoreOp::Read,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    async fn chunk_count(&self, key: Uuid) -> Result<u32> {
        let dir = self.final_dir(&key);
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("object {}", key))
            } else {
                Error::store(StoreOp::Read, e)
            }
        })?;

        let mut count = 0u32;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::store(StoreOp::Read, e))?
        {
            if entry.file_name().to_string_lossy().ends_with(".chunk") {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn read_chunk(&self, key: Uuid, index: u32) -> Result<Vec<u8>> {
        let path = self.final_dir(&key).join(chunk_file(index));
        // A missing chunk file under a committed object is corruption, not an
        // absent object; read_meta is the existence check.
        fs::read(&path).await.map_err(|e| Error::store(StoreOp::Read, e))
    }

    async fn unlink(&self, key: Uuid) -> Result<()> {
        let final_dir = self.final_dir(&key);
        match fs::remove_dir_all(&final_dir).await {
            Ok(()) => {
                debug!(object_key = %key, "chunk_store: unlinked");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("object {}", key)))
            }
            Err(e) => Err(Error::store(StoreOp::Unlink, e)),
        }
    }

    async fn exists(&self, key: Uuid) -> Result<bool> {
        let path = self.final_dir(&key).join(META_FILE);
        fs::try_exists(&path)
            .await
            .map_err(|e| Error::store(StoreOp::Read, e))
    }
}
