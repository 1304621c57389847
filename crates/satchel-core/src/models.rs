//! Core attachment types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::meta::ObjectMeta;
use crate::mime::detect_mime;

// =============================================================================
// LOAD STATE
// =============================================================================

/// How much of an attachment is currently materialized in memory.
///
/// The state moves forward through save and load operations; a partial load
/// never regresses a fully loaded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Payload held in memory, no confirmed store object yet.
    #[default]
    Unsaved,
    /// Flushed to the store; payload and transient fields stripped.
    Persisted,
    /// Metadata hydrated from the store; payload is an explicit empty buffer.
    PartiallyLoaded,
    /// Metadata and payload both hydrated from the store.
    FullyLoaded,
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsaved => write!(f, "unsaved"),
            Self::Persisted => write!(f, "persisted"),
            Self::PartiallyLoaded => write!(f, "partially_loaded"),
            Self::FullyLoaded => write!(f, "fully_loaded"),
        }
    }
}

impl std::str::FromStr for LoadState {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unsaved" => Ok(Self::Unsaved),
            "persisted" => Ok(Self::Persisted),
            "partially_loaded" => Ok(Self::PartiallyLoaded),
            "fully_loaded" => Ok(Self::FullyLoaded),
            _ => Err(format!("Invalid load state: {}", s)),
        }
    }
}

/// Whether a load materializes payload bytes or metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Hydrate metadata and payload.
    Full,
    /// Hydrate metadata only; payload becomes an explicit empty buffer.
    Partial,
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

// =============================================================================
// ATTACHMENT RECORD
// =============================================================================

/// A single binary attachment owned by a document.
///
/// The identity is assigned once at creation and never changes afterwards;
/// store objects are keyed by it, so renames and duplicate filenames cannot
/// orphan stored data. Everything else is rehydrated from store-side metadata
/// on load, which makes the store authoritative for filename and MIME type
/// once a record has been saved.
///
/// `payload` distinguishes absent (`None`, stripped after a save) from
/// explicitly empty (`Some` with zero bytes, the result of a partial load or
/// a legal zero-length attachment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRecord {
    id: Uuid,
    filename: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    mime_type: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    payload: Option<Vec<u8>>,
    #[serde(default)]
    state: LoadState,
}

impl AttachmentRecord {
    /// Create a fresh record: new identity, MIME derived from the filename
    /// (with a magic-byte fallback), configured metadata keys initialized to
    /// empty strings, payload held in memory, state [`LoadState::Unsaved`].
    pub(crate) fn new(filename: impl Into<String>, payload: Vec<u8>, keys: &[String]) -> Self {
        let filename = filename.into();
        let mime_type = Some(detect_mime(&filename, &payload));
        let metadata = keys.iter().map(|k| (k.clone(), String::new())).collect();
        Self {
            id: Uuid::now_v7(),
            filename,
            mime_type,
            metadata,
            payload: Some(payload),
            state: LoadState::Unsaved,
        }
    }

    /// Stable identity. Assigned at creation, never reassigned.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Display and lookup name. Not unique within a collection.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// MIME type, if currently known. `None` after a save strips it until a
    /// load rehydrates it from the store.
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// The configured extra metadata keys and their current values.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Mutable access to the extra metadata values.
    pub fn metadata_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.metadata
    }

    /// Payload bytes, if materialized. `None` means absent, not empty.
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// Current load state.
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// True when a save would flush this record: payload present and
    /// non-empty. Explicitly empty payloads (partial loads, zero-length
    /// attachments) are never written, which is what keeps a partial load
    /// followed by a save from truncating stored bytes.
    pub fn flushable(&self) -> bool {
        self.payload.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Install a new payload, marking the record dirty.
    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = Some(payload);
        self.state = LoadState::Unsaved;
    }

    /// Strip the record after a successful flush: payload and MIME type are
    /// dropped, metadata values reset to empty strings (the keys stay
    /// present), state becomes [`LoadState::Persisted`]. Identity and
    /// filename are retained as the join keys.
    pub fn mark_persisted(&mut self) {
        self.payload = None;
        self.mime_type = None;
        for value in self.metadata.values_mut() {
            value.clear();
        }
        self.state = LoadState::Persisted;
    }

    /// Hydrate metadata and payload from the store.
    pub fn apply_full_load(&mut self, meta: &ObjectMeta, keys: &[String], payload: Vec<u8>) {
        self.install_store_meta(meta, keys);
        self.payload = Some(payload);
        self.state = LoadState::FullyLoaded;
    }

    /// Hydrate metadata only. The payload becomes an explicit empty buffer
    /// unless the record is already fully loaded, in which case the in-memory
    /// payload (and state) are kept and only the metadata is refreshed.
    pub fn apply_partial_load(&mut self, meta: &ObjectMeta, keys: &[String]) {
        self.install_store_meta(meta, keys);
        if self.state == LoadState::FullyLoaded {
            return;
        }
        self.payload = Some(Vec::new());
        self.state = LoadState::PartiallyLoaded;
    }

    /// Make sure every configured key exists on the record. Values already
    /// present are kept; missing keys appear with empty values.
    pub fn ensure_keys(&mut self, keys: &[String]) {
        for key in keys {
            self.metadata.entry(key.clone()).or_default();
        }
    }

    // Store-side metadata is authoritative after a save: filename and MIME
    // come back from the bag, extra values are remapped onto the configured
    // key list (unknown bag entries are dropped, missing ones become empty).
    fn install_store_meta(&mut self, meta: &ObjectMeta, keys: &[String]) {
        self.filename = meta.filename.clone();
        self.mime_type = Some(meta.mime_type.clone());
        self.metadata = keys
            .iter()
            .map(|k| (k.clone(), meta.extra.get(k).cloned().unwrap_or_default()))
            .collect();
    }
}
