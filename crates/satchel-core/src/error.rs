//! Error types for satchel.

use std::fmt;

use thiserror::Error;

/// Result type alias using satchel's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// The chunk-store primitive that was executing when a failure occurred.
///
/// Store failures always name the primitive so callers can tell a failed
/// commit apart from a failed chunk write without parsing message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Opening an object for writing (create or truncate).
    Open,
    /// Writing a single chunk.
    Write,
    /// Reading chunk data or the metadata bag.
    Read,
    /// Committing a write session (making the object visible).
    Close,
    /// Removing an object and its chunks.
    Unlink,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoreOp::Open => "open",
            StoreOp::Write => "write",
            StoreOp::Read => "read",
            StoreOp::Close => "close",
            StoreOp::Unlink => "unlink",
        };
        write!(f, "{}", s)
    }
}

/// Collected failures from a fan-out batch operation.
///
/// Carries every underlying failure together with the name of the attachment
/// it belonged to, plus the batch total, so a caller can see exactly which
/// records failed and which succeeded. Guaranteed non-empty when surfaced
/// through [`Error::Aggregate`]; use [`AggregateError::into_result`] to get
/// that guarantee for free.
#[derive(Debug, Default)]
pub struct AggregateError {
    total: usize,
    failures: Vec<(String, Error)>,
}

impl AggregateError {
    /// Create an empty collector for a batch of `total` operations.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            failures: Vec::new(),
        }
    }

    /// Record one failed operation.
    pub fn push(&mut self, name: impl Into<String>, error: Error) {
        self.failures.push((name.into(), error));
    }

    /// Number of failed operations.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// True when no failures were recorded.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Size of the batch this collector was created for.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Every recorded failure, in completion order.
    pub fn failures(&self) -> &[(String, Error)] {
        &self.failures
    }

    /// `Ok(())` when empty, otherwise `Err(Error::Aggregate(self))`.
    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Aggregate(self))
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} operations failed",
            self.failures.len(),
            self.total
        )?;
        if let Some((name, err)) = self.failures.first() {
            write!(f, " (first: {}: {})", name, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|(_, err)| err as &(dyn std::error::Error + 'static))
    }
}

/// Core error type for satchel operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A required argument was absent or empty; fails before any I/O
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Attachment or stored object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Chunk store I/O failed (wraps the underlying cause)
    #[error("Store {op} failed: {source}")]
    Store {
        op: StoreOp,
        #[source]
        source: std::io::Error,
    },

    /// One or more operations in a batch failed; every cause is preserved
    #[error("Batch failure: {0}")]
    Aggregate(#[source] AggregateError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a [`Error::Store`] from the failing primitive and its cause.
    pub fn store(op: StoreOp, source: std::io::Error) -> Self {
        Error::Store { op, source }
    }

    /// True for [`Error::NotFound`]. Used where an already-absent store
    /// object is tolerated instead of surfaced.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
