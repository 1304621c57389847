//! # satchel-store
//!
//! Storage backends for satchel attachments.
//!
//! This crate provides:
//! - `FilesystemChunkStore`: chunked objects on local disk with atomic commits
//! - `MemoryChunkStore`: in-memory store for tests and embedding
//! - `BlobAdapter`: whole-payload reads and writes over any chunk store
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use satchel_store::{BlobAdapter, FilesystemChunkStore, ObjectMeta};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(FilesystemChunkStore::new("/var/lib/satchel"));
//!     let adapter = BlobAdapter::new(store, 255 * 1024)?;
//!
//!     let key = Uuid::now_v7();
//!     let meta = ObjectMeta::new("report.pdf", "application/pdf");
//!     adapter.put(key, meta, b"%PDF-1.7 ...").await?;
//!
//!     let (payload, meta) = adapter.get(key).await?;
//!     println!("read {} bytes of {}", payload.len(), meta.filename);
//!     Ok(())
//! }
//! ```
pub mod adapter;
pub mod filesystem;
pub mod memory;

// Re-export core types
pub use satchel_core::*;

pub use adapter::BlobAdapter;
pub use filesystem::FilesystemChunkStore;
pub use memory::MemoryChunkStore;
