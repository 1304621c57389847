//! Ordered attachment collections.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::AttachmentRecord;

/// The ordered set of attachments owned by one document instance.
///
/// Insertion order is preserved across every operation, including removal.
/// Duplicate filenames are legal; `add` never checks for collisions, so
/// filename-addressed operations define their own match policy (`update`
/// takes the first match, `remove_by_filename` takes every match).
///
/// The configured extra-metadata key list rides along so `add` can
/// initialize new records. It is subsystem configuration, not document
/// state, and is skipped by serde; [`AttachmentSet::adopt_keys`] re-injects
/// it after deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachmentSet {
    records: Vec<AttachmentRecord>,
    #[serde(skip)]
    keys: Vec<String>,
}

impl AttachmentSet {
    /// Empty collection configured with the given extra-metadata keys.
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            records: Vec::new(),
            keys,
        }
    }

    /// Append a new attachment: fresh identity, MIME derived from the
    /// filename, configured keys initialized, state `Unsaved`.
    ///
    /// Duplicate filenames are not rejected.
    pub fn add(&mut self, filename: impl Into<String>, payload: Vec<u8>) -> Result<&AttachmentRecord> {
        let filename = filename.into();
        if filename.is_empty() {
            return Err(Error::MissingParameter("filename"));
        }
        let idx = self.records.len();
        self.records
            .push(AttachmentRecord::new(filename, payload, &self.keys));
        Ok(&self.records[idx])
    }

    /// Replace the payload of the FIRST record whose filename matches,
    /// marking it dirty.
    pub fn update(&mut self, filename: &str, payload: Vec<u8>) -> Result<()> {
        if filename.is_empty() {
            return Err(Error::MissingParameter("filename"));
        }
        match self.records.iter_mut().find(|r| r.filename() == filename) {
            Some(record) => {
                record.set_payload(payload);
                Ok(())
            }
            None => Err(Error::NotFound(format!("attachment {}", filename))),
        }
    }

    /// Remove EVERY record whose filename matches, preserving the relative
    /// order of the survivors, and hand the removed records back so the
    /// caller can release their store objects.
    pub fn remove_by_filename(&mut self, filename: &str) -> Result<Vec<AttachmentRecord>> {
        if filename.is_empty() {
            return Err(Error::MissingParameter("filename"));
        }
        let all = std::mem::take(&mut self.records);
        let (removed, kept): (Vec<_>, Vec<_>) =
            all.into_iter().partition(|r| r.filename() == filename);
        self.records = kept;
        if removed.is_empty() {
            return Err(Error::NotFound(format!("attachment {}", filename)));
        }
        Ok(removed)
    }

    /// Every record whose filename matches, in collection order. An empty
    /// result is not an error.
    pub fn find_by_filename(&self, filename: &str) -> Vec<&AttachmentRecord> {
        self.records
            .iter()
            .filter(|r| r.filename() == filename)
            .collect()
    }

    /// Look a record up by its stable identity.
    pub fn find_by_id(&self, id: Uuid) -> Option<&AttachmentRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// The records in insertion order.
    pub fn records(&self) -> &[AttachmentRecord] {
        &self.records
    }

    /// Mutable access to the records. Membership and order stay fixed (a
    /// slice cannot insert or remove); individual records can be mutated.
    pub fn records_mut(&mut self) -> &mut [AttachmentRecord] {
        &mut self.records
    }

    /// Iterate the records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, AttachmentRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The configured extra-metadata keys.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Re-inject the configured key list (serde drops it) and make sure
    /// every record carries every key.
    pub fn adopt_keys(&mut self, keys: &[String]) {
        self.keys = keys.to_vec();
        for record in &mut self.records {
            record.ensure_keys(keys);
        }
    }
}

impl<'a> IntoIterator for &'a AttachmentSet {
    type Item = &'a AttachmentRecord;
    type IntoIter = std::slice::Iter<'a, AttachmentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
