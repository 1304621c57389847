//! Tests for document-type bindings over the filesystem store.
//!
//! Runs the full stack: a host document carrying an attachment set, flushed
//! through a binding before the document serializes, then revived from JSON
//! and hydrated back.

use std::sync::Arc;

use satchel_engine::{
    AttachmentEngine, AttachmentHost, AttachmentSet, EngineConfig, Error, LoadMode, LoadState,
};
use satchel_store::FilesystemChunkStore;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

/// Minimal host document for tests.
#[derive(Debug, Serialize, Deserialize)]
struct Note {
    title: String,
    attachments: AttachmentSet,
}

impl AttachmentHost for Note {
    fn attachments(&self) -> &AttachmentSet {
        &self.attachments
    }

    fn attachments_mut(&mut self) -> &mut AttachmentSet {
        &mut self.attachments
    }
}

fn setup_engine(temp_dir: &TempDir) -> AttachmentEngine {
    let store = Arc::new(FilesystemChunkStore::new(temp_dir.path()));
    AttachmentEngine::new(
        EngineConfig::new(store)
            .with_keys(vec!["caption".to_string()])
            .with_chunk_size(1024),
    )
    .expect("Failed to create engine")
}

#[tokio::test]
async fn test_flush_serialize_revive_hydrate() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let engine = setup_engine(&temp_dir);
    let binding = engine.bind_type("note");

    let mut note = Note {
        title: "board minutes".to_string(),
        attachments: binding.new_set(),
    };
    note.attachments
        .add("minutes.txt", b"Attendees: everyone".to_vec())
        .expect("Failed to add attachment");
    note.attachments.records_mut()[0]
        .metadata_mut()
        .insert("caption".to_string(), "June meeting".to_string());

    binding.flush(&mut note).await.expect("Failed to flush");

    // The document serializes lean: no payload bytes, stripped records.
    let json = serde_json::to_string(&note).expect("Failed to serialize");
    assert!(
        !json.contains("payload"),
        "Flushed payload bytes must not ride along in the document: {json}"
    );
    assert!(json.contains("\"state\":\"persisted\""));

    let mut revived: Note = serde_json::from_str(&json).expect("Failed to deserialize");
    binding
        .hydrate(&mut revived)
        .await
        .expect("Failed to hydrate");

    let record = &revived.attachments.records()[0];
    assert_eq!(record.state(), LoadState::FullyLoaded);
    assert_eq!(record.payload(), Some(b"Attendees: everyone".as_slice()));
    assert_eq!(record.mime_type(), Some("text/plain; charset=utf-8"));
    assert_eq!(
        record.metadata().get("caption").map(String::as_str),
        Some("June meeting"),
        "Extras hydrate from the store bag"
    );
    assert_eq!(
        record.id(),
        note.attachments.records()[0].id(),
        "Identity survives the serialize-revive cycle"
    );
}

#[tokio::test]
async fn test_bind_type_is_idempotent() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let engine = setup_engine(&temp_dir);

    let first = engine.bind_type("note");
    let second = engine.bind_type("note");
    assert_eq!(first.doc_type(), "note");
    assert_eq!(second.doc_type(), "note");

    // Both bindings drive the same engine: one flushes, the other loads.
    let mut note = Note {
        title: "shared".to_string(),
        attachments: first.new_set(),
    };
    note.attachments
        .add("shared.txt", b"written via first".to_vec())
        .expect("Failed to add attachment");

    first.flush(&mut note).await.expect("Failed to flush");
    second
        .load(&mut note, LoadMode::Partial)
        .await
        .expect("Failed to load");
    assert_eq!(
        note.attachments.records()[0].state(),
        LoadState::PartiallyLoaded
    );
}

#[tokio::test]
async fn test_flush_failure_aborts_document_save() {
    // A store rooted where nothing can be created fails every put.
    let store = Arc::new(FilesystemChunkStore::new("/proc/nonexistent/satchel"));
    let engine = AttachmentEngine::new(EngineConfig::new(store).with_chunk_size(1024))
        .expect("Failed to create engine");
    let binding = engine.bind_type("note");

    let mut note = Note {
        title: "doomed".to_string(),
        attachments: binding.new_set(),
    };
    note.attachments
        .add("unwritable.txt", b"never lands".to_vec())
        .expect("Failed to add attachment");

    let err = binding.flush(&mut note).await.unwrap_err();
    assert!(
        matches!(err, Error::Aggregate(_)),
        "Flush failure should surface to the document save: {err}"
    );
    assert!(
        note.attachments.records()[0].flushable(),
        "The record keeps its payload so the save can be retried"
    );
}
