//! Document-type bindings.
//!
//! A binding attaches the engine to one host document type and carries the
//! type name into tracing spans. Binding is the explicit registration step:
//! the first `bind_type` call for a name registers it, later calls log and
//! hand back an equivalent binding rather than failing, so plugin-style
//! double application stays harmless.

use std::sync::Arc;

use satchel_core::{AttachmentHost, AttachmentSet, LoadMode, Result};
use tracing::{debug, info, instrument};

use crate::engine::AttachmentEngine;

impl AttachmentEngine {
    /// Bind this engine to a document type.
    ///
    /// Idempotent per name: rebinding an already-registered type returns an
    /// equivalent binding.
    pub fn bind_type(&self, doc_type: &str) -> DocumentBinding {
        {
            let mut bound = self.bound_types().lock().expect("lock poisoned");
            if bound.insert(doc_type.to_string()) {
                info!(%doc_type, "document type bound");
            } else {
                debug!(%doc_type, "document type already bound");
            }
        }
        DocumentBinding {
            engine: self.clone(),
            doc_type: Arc::from(doc_type),
        }
    }
}

/// An engine handle scoped to one document type.
#[derive(Clone, Debug)]
pub struct DocumentBinding {
    engine: AttachmentEngine,
    doc_type: Arc<str>,
}

impl DocumentBinding {
    /// Name of the bound document type.
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// The underlying engine.
    pub fn engine(&self) -> &AttachmentEngine {
        &self.engine
    }

    /// Create an empty set carrying the bound engine's metadata keys.
    pub fn new_set(&self) -> AttachmentSet {
        self.engine.new_set()
    }

    /// On-load hook: hydrate a materialized document's attachments.
    #[instrument(skip_all, fields(doc_type = %self.doc_type))]
    pub async fn hydrate<H: AttachmentHost>(&self, host: &mut H) -> Result<()> {
        debug!("hydrating document attachments");
        self.engine.hydrate_document(host).await
    }

    /// Before-persist hook: flush unsaved attachment payloads.
    ///
    /// A failure here must abort the document save; callers propagate the
    /// error instead of persisting a document whose payloads never landed.
    #[instrument(skip_all, fields(doc_type = %self.doc_type))]
    pub async fn flush<H: AttachmentHost>(&self, host: &mut H) -> Result<()> {
        debug!("flushing document attachments");
        self.engine.save_document(host).await
    }

    /// Load a document's attachments in the given mode.
    #[instrument(skip_all, fields(doc_type = %self.doc_type, %mode))]
    pub async fn load<H: AttachmentHost>(&self, host: &mut H, mode: LoadMode) -> Result<()> {
        self.engine.load_document(host, mode).await
    }
}
