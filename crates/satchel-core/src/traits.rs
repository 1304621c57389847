//! Trait seams between the engine and its collaborators.
//!
//! Traits live here; implementations live in the sibling crates
//! (`satchel-store` ships the filesystem and in-memory chunk stores).

use async_trait::async_trait;
use uuid::Uuid;

use crate::collection::AttachmentSet;
use crate::error::Result;
use crate::meta::ObjectMeta;

/// Chunk-granularity storage contract the persistence engine writes through.
///
/// Objects are keyed by attachment identity. A write is a session:
/// `begin_write` opens (and truncates) the object, `write_chunk` appends
/// chunks in index order, `commit_write` makes the object visible to readers
/// in one step. Readers never observe a half-written object. `read_meta`
/// returns the metadata bag without touching chunk data, which is what makes
/// metadata-only loads cheap.
///
/// Implementations translate their native failures into the satchel error
/// taxonomy: an absent object is `NotFound`, everything else is `Store` with
/// the failing primitive named.
///
/// Two concurrent write sessions against the SAME key are unsupported; the
/// engine's write lock serializes batches, and identities are unique within
/// a batch.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Open `key` for writing, discarding any staged chunks from an earlier
    /// unfinished session. The metadata bag is staged with the object.
    async fn begin_write(&self, key: Uuid, meta: &ObjectMeta) -> Result<()>;

    /// Stage chunk `index` for an object opened with `begin_write`.
    async fn write_chunk(&self, key: Uuid, index: u32, data: &[u8]) -> Result<()>;

    /// Atomically publish the staged object, replacing any prior version.
    async fn commit_write(&self, key: Uuid) -> Result<()>;

    /// The metadata bag of a committed object. No chunk I/O.
    async fn read_meta(&self, key: Uuid) -> Result<ObjectMeta>;

    /// Number of chunks in a committed object.
    async fn chunk_count(&self, key: Uuid) -> Result<u32>;

    /// One chunk of a committed object.
    async fn read_chunk(&self, key: Uuid, index: u32) -> Result<Vec<u8>>;

    /// Remove a committed object and its chunks. `NotFound` if absent.
    async fn unlink(&self, key: Uuid) -> Result<()>;

    /// Whether a committed object exists.
    async fn exists(&self, key: Uuid) -> Result<bool>;
}

/// A document type that owns an attachment collection.
///
/// The engine reads and writes the collection through this seam; the
/// document's own persistence (whatever ORM or store it uses) serializes the
/// collection as an ordinary field.
pub trait AttachmentHost {
    fn attachments(&self) -> &AttachmentSet;
    fn attachments_mut(&mut self) -> &mut AttachmentSet;
}
