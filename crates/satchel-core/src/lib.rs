//! # satchel-core
//!
//! Core types, traits, and error taxonomy for the satchel attachment engine.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the satchel store and engine crates depend on.

pub mod collection;
pub mod defaults;
pub mod error;
pub mod meta;
pub mod mime;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use collection::AttachmentSet;
pub use error::{AggregateError, Error, Result, StoreOp};
pub use meta::{is_reserved_key, ObjectMeta, RESERVED_META_KEYS};
pub use mime::detect_mime;
pub use models::{AttachmentRecord, LoadMode, LoadState};
pub use traits::{AttachmentHost, ChunkStore};
