//! Attachment persistence coordinator.
//!
//! The engine moves attachment payloads between in-memory sets and a chunk
//! store. Saves are write-back: records accumulate payload bytes in memory
//! and nothing touches the store until [`AttachmentEngine::save_all`] flushes
//! the batch under the write lock. Loads fan out per record and install
//! store-side metadata as the authoritative copy.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use satchel_core::{
    detect_mime, AggregateError, AttachmentHost, AttachmentRecord, AttachmentSet, Error, LoadMode,
    ObjectMeta, Result,
};
use satchel_store::BlobAdapter;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::lock::StoreLock;

/// Coordinates attachment persistence between in-memory sets and a store.
///
/// Cloning is cheap; clones share the adapter and the lock scope.
#[derive(Clone, Debug)]
pub struct AttachmentEngine {
    adapter: Arc<BlobAdapter>,
    lock: StoreLock,
    keys: Arc<Vec<String>>,
    lazy_loading: bool,
    bound: Arc<Mutex<HashSet<String>>>,
}

impl AttachmentEngine {
    /// Create an engine with its own lock scope.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_lock(config, StoreLock::new())
    }

    /// Create an engine sharing an existing lock scope.
    ///
    /// Engines flushing into the same physical store should share one scope
    /// so their save batches serialize against each other.
    pub fn with_lock(config: EngineConfig, lock: StoreLock) -> Result<Self> {
        config.validate()?;
        let EngineConfig {
            store,
            keys,
            chunk_size,
            lazy_loading,
        } = config;
        let adapter = Arc::new(BlobAdapter::new(store, chunk_size)?);

        info!(
            chunk_size,
            lazy_loading,
            metadata_keys = keys.len(),
            "attachment engine ready"
        );
        Ok(Self {
            adapter,
            lock,
            keys: Arc::new(keys),
            lazy_loading,
            bound: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    pub(crate) fn bound_types(&self) -> &Mutex<HashSet<String>> {
        &self.bound
    }

    /// Metadata keys carried on every attachment.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Whether hydration defers payload reads.
    pub fn lazy_loading(&self) -> bool {
        self.lazy_loading
    }

    /// Handle onto this engine's lock scope.
    pub fn lock(&self) -> StoreLock {
        self.lock.clone()
    }

    /// Create an empty attachment set carrying this engine's metadata keys.
    pub fn new_set(&self) -> AttachmentSet {
        AttachmentSet::new(self.keys.to_vec())
    }

    /// Flush every record carrying unsaved payload bytes to the store.
    ///
    /// The whole batch holds the write side of the lock scope, so batches
    /// from different handles never interleave; puts within one batch run
    /// concurrently. Each record flushed successfully is stripped of its
    /// payload and marked `Persisted` even when a sibling record fails, and
    /// any failures come back as a single aggregate. Records whose payload
    /// is absent or explicitly empty are skipped, which keeps a partial load
    /// followed by a save from truncating stored bytes.
    pub async fn save_all(&self, set: &mut AttachmentSet) -> Result<()> {
        let _guard = self.lock.acquire_write().await;

        let mut targets = Vec::new();
        let mut puts = Vec::new();
        for (idx, record) in set.records().iter().enumerate() {
            if !record.flushable() {
                continue;
            }
            let Some(payload) = record.payload() else {
                continue;
            };
            targets.push((idx, record.filename().to_string()));
            puts.push(self.adapter.put(record.id(), self.store_meta(record), payload));
        }
        if puts.is_empty() {
            debug!("save_all: no records carry payload bytes");
            return Ok(());
        }

        let total = puts.len();
        debug!(flushing = total, records = set.len(), "save_all: flushing batch");
        let results = join_all(puts).await;

        let mut failures = AggregateError::new(total);
        for ((idx, filename), result) in targets.into_iter().zip(results) {
            match result {
                Ok(_) => set.records_mut()[idx].mark_persisted(),
                Err(e) => {
                    warn!(attachment = %filename, error = %e, "save_all: flush failed");
                    failures.push(filename, e);
                }
            }
        }
        failures.into_result()
    }

    /// Load every record in the set from the store.
    ///
    /// `Full` installs payload bytes and marks records `FullyLoaded`;
    /// `Partial` reads only metadata bags and sets payloads explicitly empty,
    /// except on records already fully loaded, which keep their bytes.
    /// Store-side filename, mime type, and configured extras overwrite the
    /// in-memory copies. Failures aggregate; failed records keep their prior
    /// state.
    pub async fn load_all(&self, set: &mut AttachmentSet, mode: LoadMode) -> Result<()> {
        debug!(records = set.len(), %mode, "load_all");
        match mode {
            LoadMode::Full => self.fetch_full(set, None).await.map(|_| ()),
            LoadMode::Partial => self.fetch_partial(set, None).await.map(|_| ()),
        }
    }

    /// Load the records matching `filename`, leaving the rest untouched.
    ///
    /// Zero matches succeed as a no-op; an empty filename is rejected.
    pub async fn load_one(
        &self,
        set: &mut AttachmentSet,
        filename: &str,
        mode: LoadMode,
    ) -> Result<()> {
        if filename.is_empty() {
            return Err(Error::MissingParameter("filename"));
        }

        let loaded = match mode {
            LoadMode::Full => self.fetch_full(set, Some(filename)).await?,
            LoadMode::Partial => self.fetch_partial(set, Some(filename)).await?,
        };
        if loaded == 0 {
            debug!(attachment = %filename, "load_one: no matching records");
        }
        Ok(())
    }

    /// Remove every record matching `filename` and delete its store objects.
    ///
    /// In-memory removal happens first and is never rolled back. A store
    /// object already absent is tolerated; other delete failures are reported
    /// as an aggregate while the records stay removed.
    pub async fn remove(&self, set: &mut AttachmentSet, filename: &str) -> Result<()> {
        let removed = set.remove_by_filename(filename)?;

        let total = removed.len();
        let deletes: Vec<_> = removed.iter().map(|r| self.adapter.delete(r.id())).collect();
        let results = join_all(deletes).await;

        let mut failures = AggregateError::new(total);
        for (record, result) in removed.iter().zip(results) {
            match result {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(
                        attachment = %record.filename(),
                        object_key = %record.id(),
                        "remove: store object already absent"
                    );
                }
                Err(e) => {
                    warn!(attachment = %record.filename(), error = %e, "remove: store delete failed");
                    failures.push(record.filename().to_string(), e);
                }
            }
        }
        failures.into_result()
    }

    /// Prepare a freshly materialized set for use.
    ///
    /// Reinstalls the configured key list (dropped during serialization),
    /// then loads records fully, or metadata-only when lazy loading is on.
    pub async fn hydrate(&self, set: &mut AttachmentSet) -> Result<()> {
        set.adopt_keys(&self.keys);
        let mode = if self.lazy_loading {
            LoadMode::Partial
        } else {
            LoadMode::Full
        };
        self.load_all(set, mode).await
    }

    /// Flush a host document's attachments before the document is persisted.
    pub async fn save_document<H: AttachmentHost>(&self, host: &mut H) -> Result<()> {
        self.save_all(host.attachments_mut()).await
    }

    /// Load a host document's attachments in the given mode.
    pub async fn load_document<H: AttachmentHost>(&self, host: &mut H, mode: LoadMode) -> Result<()> {
        self.load_all(host.attachments_mut(), mode).await
    }

    /// Hydrate a host document's attachments after materialization.
    pub async fn hydrate_document<H: AttachmentHost>(&self, host: &mut H) -> Result<()> {
        self.hydrate(host.attachments_mut()).await
    }

    // The bag a record flushes: filename, mime type (re-derived if a prior
    // save stripped it), and the configured extras.
    fn store_meta(&self, record: &AttachmentRecord) -> ObjectMeta {
        let mime = match record.mime_type() {
            Some(m) => m.to_string(),
            None => detect_mime(record.filename(), record.payload().unwrap_or_default()),
        };
        let mut meta = ObjectMeta::new(record.filename(), mime);
        meta.extra = record.metadata().clone();
        meta
    }

    async fn fetch_full(&self, set: &mut AttachmentSet, filter: Option<&str>) -> Result<usize> {
        let mut targets = Vec::new();
        let mut gets = Vec::new();
        for (idx, record) in set.records().iter().enumerate() {
            if filter.is_some_and(|f| record.filename() != f) {
                continue;
            }
            targets.push((idx, record.filename().to_string()));
            gets.push(self.adapter.get(record.id()));
        }
        if gets.is_empty() {
            return Ok(0);
        }

        let total = gets.len();
        let results = join_all(gets).await;
        let mut failures = AggregateError::new(total);
        for ((idx, filename), result) in targets.into_iter().zip(results) {
            match result {
                Ok((payload, meta)) => {
                    set.records_mut()[idx].apply_full_load(&meta, &self.keys, payload);
                }
                Err(e) => {
                    warn!(attachment = %filename, error = %e, "load: fetch failed");
                    failures.push(filename, e);
                }
            }
        }
        failures.into_result().map(|_| total)
    }

    async fn fetch_partial(&self, set: &mut AttachmentSet, filter: Option<&str>) -> Result<usize> {
        let mut targets = Vec::new();
        let mut gets = Vec::new();
        for (idx, record) in set.records().iter().enumerate() {
            if filter.is_some_and(|f| record.filename() != f) {
                continue;
            }
            targets.push((idx, record.filename().to_string()));
            gets.push(self.adapter.get_meta(record.id()));
        }
        if gets.is_empty() {
            return Ok(0);
        }

        let total = gets.len();
        let results = join_all(gets).await;
        let mut failures = AggregateError::new(total);
        for ((idx, filename), result) in targets.into_iter().zip(results) {
            match result {
                Ok(meta) => {
                    set.records_mut()[idx].apply_partial_load(&meta, &self.keys);
                }
                Err(e) => {
                    warn!(attachment = %filename, error = %e, "load: meta fetch failed");
                    failures.push(filename, e);
                }
            }
        }
        failures.into_result().map(|_| total)
    }
}
