//! Engine configuration.

use std::collections::HashSet;
use std::sync::Arc;

use satchel_core::defaults::{
    DEFAULT_CHUNK_SIZE, ENV_CHUNK_SIZE, ENV_LAZY_LOADING, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE,
};
use satchel_core::{is_reserved_key, ChunkStore, Error, Result};
use tracing::warn;

/// Configuration for an [`AttachmentEngine`](crate::AttachmentEngine).
#[derive(Clone)]
pub struct EngineConfig {
    /// Chunk store holding attachment payloads.
    pub store: Arc<dyn ChunkStore>,
    /// Extra metadata keys carried on every attachment.
    pub keys: Vec<String>,
    /// Chunk size for payload writes, in bytes.
    pub chunk_size: usize,
    /// Hydrate documents with metadata only, deferring payload reads.
    pub lazy_loading: bool,
}

impl EngineConfig {
    /// Create a config with default settings for the given store.
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self {
            store,
            keys: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            lazy_loading: false,
        }
    }

    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SATCHEL_CHUNK_SIZE` | `261120` | Chunk size for payload writes, in bytes |
    /// | `SATCHEL_LAZY_LOADING` | `false` | Hydrate documents with metadata only |
    pub fn from_env(store: Arc<dyn ChunkStore>) -> Self {
        let chunk_size = match std::env::var(ENV_CHUNK_SIZE) {
            Ok(raw) => match raw.parse::<usize>() {
                Ok(size) => size,
                Err(_) => {
                    warn!(
                        value = %raw,
                        default = DEFAULT_CHUNK_SIZE,
                        "Invalid {} value, using default",
                        ENV_CHUNK_SIZE
                    );
                    DEFAULT_CHUNK_SIZE
                }
            },
            Err(_) => DEFAULT_CHUNK_SIZE,
        };

        let lazy_loading = std::env::var(ENV_LAZY_LOADING)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            store,
            keys: Vec::new(),
            chunk_size,
            lazy_loading,
        }
    }

    /// Set the extra metadata keys carried on every attachment.
    pub fn with_keys(mut self, keys: Vec<String>) -> Self {
        self.keys = keys;
        self
    }

    /// Set the chunk size for payload writes.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Enable or disable metadata-only hydration.
    pub fn with_lazy_loading(mut self, lazy: bool) -> Self {
        self.lazy_loading = lazy;
        self
    }

    /// Check the config for values that would misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size < MIN_CHUNK_SIZE || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::Config(format!(
                "chunk size {} out of range [{}, {}]",
                self.chunk_size, MIN_CHUNK_SIZE, MAX_CHUNK_SIZE
            )));
        }

        let mut seen = HashSet::new();
        for key in &self.keys {
            if key.is_empty() {
                return Err(Error::Config("metadata key must not be empty".to_string()));
            }
            if is_reserved_key(key) {
                return Err(Error::Config(format!(
                    "metadata key '{}' is reserved for storage facts",
                    key
                )));
            }
            if !seen.insert(key.as_str()) {
                return Err(Error::Config(format!("duplicate metadata key '{}'", key)));
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("keys", &self.keys)
            .field("chunk_size", &self.chunk_size)
            .field("lazy_loading", &self.lazy_loading)
            .finish()
    }
}
