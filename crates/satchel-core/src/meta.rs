//! The metadata bag attached to every stored object.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field names the bag itself uses. Configured extra-metadata keys must not
/// collide with these; config validation rejects them.
pub const RESERVED_META_KEYS: &[&str] = &["filename", "mimetype", "length", "checksum", "uploaded_at"];

/// True when `key` collides with a reserved bag field.
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_META_KEYS.contains(&key)
}

/// Small structured record attached to a store object, retrievable without
/// reading any chunk data.
///
/// Serialized flat: the configured extra keys sit beside the built-in fields
/// rather than under a nested map. `length`, `checksum`, and `uploaded_at`
/// are filled in by the adapter when the object is written; they describe the
/// stored bytes, not the in-memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub filename: String,
    #[serde(rename = "mimetype")]
    pub mime_type: String,
    #[serde(default)]
    pub length: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Bag with the given identity fields and no stored-object facts yet.
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            length: 0,
            checksum: None,
            uploaded_at: None,
            extra: BTreeMap::new(),
        }
    }
}
