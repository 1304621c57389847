//! Tests for save batching under the shared write lock.
//!
//! Uses an instrumented store wrapper to observe the order of store
//! primitives: batches from engines sharing a lock scope must never
//! interleave, while puts inside one batch are free to overlap. Also covers
//! partial batch failure: flushed siblings stay flushed and the caller gets
//! one aggregate error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use satchel_engine::{
    AttachmentEngine, ChunkStore, EngineConfig, Error, LoadState, ObjectMeta, Result, StoreLock,
    StoreOp,
};
use satchel_store::MemoryChunkStore;
use tokio::time::sleep;
use uuid::Uuid;

/// Route engine tracing into the test output when `RUST_LOG` is set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Store wrapper that logs which attachment each write primitive touched,
/// pausing inside chunk writes to widen any interleaving window.
struct RecordingStore {
    inner: MemoryChunkStore,
    names: Mutex<HashMap<Uuid, String>>,
    events: Mutex<Vec<(&'static str, String)>>,
    write_pause: Duration,
}

impl RecordingStore {
    fn new(write_pause: Duration) -> Self {
        Self {
            inner: MemoryChunkStore::new(),
            names: Mutex::new(HashMap::new()),
            events: Mutex::new(Vec::new()),
            write_pause,
        }
    }

    fn record(&self, op: &'static str, key: Uuid) {
        let name = self
            .names
            .lock()
            .expect("lock poisoned")
            .get(&key)
            .cloned()
            .unwrap_or_default();
        self.events.lock().expect("lock poisoned").push((op, name));
    }

    fn events(&self) -> Vec<(&'static str, String)> {
        self.events.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl ChunkStore for RecordingStore {
    async fn begin_write(&self, key: Uuid, meta: &ObjectMeta) -> Result<()> {
        self.names
            .lock()
            .expect("lock poisoned")
            .insert(key, meta.filename.clone());
        self.record("begin", key);
        self.inner.begin_write(key, meta).await
    }

    async fn write_chunk(&self, key: Uuid, index: u32, data: &[u8]) -> Result<()> {
        sleep(self.write_pause).await;
        self.record("write", key);
        self.inner.write_chunk(key, index, data).await
    }

    async fn commit_write(&self, key: Uuid) -> Result<()> {
        self.record("commit", key);
        self.inner.commit_write(key).await
    }

    async fn read_meta(&self, key: Uuid) -> Result<ObjectMeta> {
        self.inner.read_meta(key).await
    }

    async fn chunk_count(&self, key: Uuid) -> Result<u32> {
        self.inner.chunk_count(key).await
    }

    async fn read_chunk(&self, key: Uuid, index: u32) -> Result<Vec<u8>> {
        self.inner.read_chunk(key, index).await
    }

    async fn unlink(&self, key: Uuid) -> Result<()> {
        self.inner.unlink(key).await
    }

    async fn exists(&self, key: Uuid) -> Result<bool> {
        self.inner.exists(key).await
    }
}

fn recording_engine(store: Arc<RecordingStore>, lock: StoreLock) -> AttachmentEngine {
    AttachmentEngine::with_lock(EngineConfig::new(store).with_chunk_size(1024), lock)
        .expect("Failed to create engine")
}

/// Save a batch of three attachments named `{prefix}-{i}.bin`.
async fn save_batch(engine: &AttachmentEngine, prefix: &str) -> Result<()> {
    let mut set = engine.new_set();
    for i in 0..3 {
        set.add(format!("{prefix}-{i}.bin"), vec![i as u8; 1500])
            .expect("Failed to add attachment");
    }
    engine.save_all(&mut set).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batches_sharing_a_lock_scope_never_interleave() {
    init_tracing();
    let store = Arc::new(RecordingStore::new(Duration::from_millis(5)));
    let lock = StoreLock::new();
    let engine_a = recording_engine(store.clone(), lock.clone());
    let engine_b = recording_engine(store.clone(), lock.clone());

    let task_a = tokio::spawn(async move { save_batch(&engine_a, "a").await });
    let task_b = tokio::spawn(async move { save_batch(&engine_b, "b").await });
    task_a
        .await
        .expect("Task panicked")
        .expect("Batch a failed");
    task_b
        .await
        .expect("Task panicked")
        .expect("Batch b failed");

    let events = store.events();
    let first_a = events.iter().position(|(_, n)| n.starts_with("a-"));
    let last_a = events.iter().rposition(|(_, n)| n.starts_with("a-"));
    let first_b = events.iter().position(|(_, n)| n.starts_with("b-"));
    let last_b = events.iter().rposition(|(_, n)| n.starts_with("b-"));
    let (first_a, last_a) = (first_a.expect("batch a wrote"), last_a.expect("batch a wrote"));
    let (first_b, last_b) = (first_b.expect("batch b wrote"), last_b.expect("batch b wrote"));

    assert!(
        last_a < first_b || last_b < first_a,
        "One batch must fully finish before the other touches the store: {events:?}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_puts_within_a_batch_overlap() {
    init_tracing();
    let store = Arc::new(RecordingStore::new(Duration::from_millis(5)));
    let engine = recording_engine(store.clone(), StoreLock::new());

    save_batch(&engine, "solo").await.expect("Batch failed");

    let events = store.events();
    let first_commit = events
        .iter()
        .position(|(op, _)| *op == "commit")
        .expect("Batch should commit");
    let begins_before_commit = events[..first_commit]
        .iter()
        .filter(|(op, _)| *op == "begin")
        .count();
    assert_eq!(
        begins_before_commit, 3,
        "All puts in a batch should open before any commits: {events:?}"
    );
}

/// Store wrapper that rejects writes for one configured filename.
struct FlakyStore {
    inner: MemoryChunkStore,
    fail_name: Mutex<Option<String>>,
}

impl FlakyStore {
    fn failing_on(name: &str) -> Self {
        Self {
            inner: MemoryChunkStore::new(),
            fail_name: Mutex::new(Some(name.to_string())),
        }
    }

    fn heal(&self) {
        *self.fail_name.lock().expect("lock poisoned") = None;
    }
}

#[async_trait]
impl ChunkStore for FlakyStore {
    async fn begin_write(&self, key: Uuid, meta: &ObjectMeta) -> Result<()> {
        let failing = self.fail_name.lock().expect("lock poisoned").clone();
        if failing.as_deref() == Some(meta.filename.as_str()) {
            return Err(Error::store(
                StoreOp::Open,
                std::io::Error::new(std::io::ErrorKind::Other, "injected write failure"),
            ));
        }
        self.inner.begin_write(key, meta).await
    }

    async fn write_chunk(&self, key: Uuid, index: u32, data: &[u8]) -> Result<()> {
        self.inner.write_chunk(key, index, data).await
    }

    async fn commit_write(&self, key: Uuid) -> Result<()> {
        self.inner.commit_write(key).await
    }

    async fn read_meta(&self, key: Uuid) -> Result<ObjectMeta> {
        self.inner.read_meta(key).await
    }

    async fn chunk_count(&self, key: Uuid) -> Result<u32> {
        self.inner.chunk_count(key).await
    }

    async fn read_chunk(&self, key: Uuid, index: u32) -> Result<Vec<u8>> {
        self.inner.read_chunk(key, index).await
    }

    async fn unlink(&self, key: Uuid) -> Result<()> {
        self.inner.unlink(key).await
    }

    async fn exists(&self, key: Uuid) -> Result<bool> {
        self.inner.exists(key).await
    }
}

#[tokio::test]
async fn test_save_failure_aggregates_and_spares_siblings() {
    init_tracing();
    let store = Arc::new(FlakyStore::failing_on("bad.bin"));
    let engine =
        AttachmentEngine::new(EngineConfig::new(store.clone()).with_chunk_size(1024))
            .expect("Failed to create engine");

    let mut set = engine.new_set();
    set.add("good.bin", vec![1u8; 100]).expect("add failed");
    set.add("bad.bin", vec![2u8; 100]).expect("add failed");

    let err = engine.save_all(&mut set).await.unwrap_err();
    match &err {
        Error::Aggregate(agg) => {
            assert_eq!(agg.total(), 2);
            assert_eq!(agg.len(), 1, "Exactly one put should have failed");
            assert_eq!(agg.failures()[0].0, "bad.bin");
            assert!(matches!(
                agg.failures()[0].1,
                Error::Store { op: StoreOp::Open, .. }
            ));
        }
        other => panic!("Expected an aggregate failure, got: {other}"),
    }
    assert!(
        err.to_string().contains("1 of 2"),
        "Failure counts should be visible in the message: {err}"
    );

    // The sibling that flushed stays flushed and stripped.
    assert_eq!(set.records()[0].state(), LoadState::Persisted);
    assert!(set.records()[0].payload().is_none());
    assert_eq!(store.inner.len(), 1, "Only the good object should exist");

    // The failed record keeps its payload and can be retried.
    assert_eq!(set.records()[1].state(), LoadState::Unsaved);
    assert!(set.records()[1].flushable());

    store.heal();
    engine
        .save_all(&mut set)
        .await
        .expect("Retry should flush the failed record");
    assert_eq!(set.records()[1].state(), LoadState::Persisted);
    assert_eq!(store.inner.len(), 2);
}
