//! # satchel-engine
//!
//! Attachment persistence engine for satchel.
//!
//! This crate provides:
//! - Batched, write-locked saves with concurrent per-attachment flushes
//! - Full and metadata-only (partial) loads
//! - Document-type bindings with hydrate and flush hooks
//! - Configuration from code or environment
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use satchel_engine::{AttachmentEngine, EngineConfig, LoadMode};
//! use satchel_store::FilesystemChunkStore;
//!
//! let store = Arc::new(FilesystemChunkStore::new("/var/lib/satchel"));
//! let engine = AttachmentEngine::new(
//!     EngineConfig::new(store).with_keys(vec!["caption".to_string()]),
//! )?;
//!
//! // Accumulate payloads in memory, then flush the batch in one save.
//! let mut attachments = engine.new_set();
//! attachments.add("notes.txt", b"remember the milk".to_vec())?;
//! engine.save_all(&mut attachments).await?;
//!
//! // Later: bring the payloads back.
//! engine.load_all(&mut attachments, LoadMode::Full).await?;
//! ```

pub mod config;
pub mod engine;
pub mod lock;
pub mod registry;

// Re-export core types
pub use satchel_core::*;

pub use config::EngineConfig;
pub use engine::AttachmentEngine;
pub use lock::StoreLock;
pub use registry::DocumentBinding;
