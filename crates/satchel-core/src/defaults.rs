//! Centralized default constants for satchel.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates should reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// CHUNKING
// =============================================================================

/// Default chunk size for stored payloads in bytes (255 KiB).
///
/// Matches the native chunk size of the blob stores this engine targets, so
/// objects written here stay compatible with tooling that assumes it.
pub const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;

/// Smallest configurable chunk size in bytes. Anything lower produces
/// pathological chunk counts for ordinary attachments.
pub const MIN_CHUNK_SIZE: usize = 1024;

/// Largest configurable chunk size in bytes (16 MiB). Caps per-chunk memory
/// during writes and reads.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// MIME
// =============================================================================

/// MIME type used when neither the filename extension nor the payload's
/// magic bytes identify the content.
pub const FALLBACK_MIME: &str = "application/octet-stream";

// =============================================================================
// FILENAMES
// =============================================================================

/// Maximum filename length (ext4/NTFS compatible).
pub const FILENAME_MAX_LENGTH: usize = 255;

// =============================================================================
// ENVIRONMENT OVERRIDES
// =============================================================================

/// Environment variable overriding the configured chunk size in bytes.
pub const ENV_CHUNK_SIZE: &str = "SATCHEL_CHUNK_SIZE";

/// Environment variable overriding the lazy-loading flag ("true"/"1").
pub const ENV_LAZY_LOADING: &str = "SATCHEL_LAZY_LOADING";
