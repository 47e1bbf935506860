//! Error types for stateful-processor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Snapshot could not be read, parsed, or written.
    #[error("storage error on {resource}: {source}")]
    Storage {
        resource: String,
        #[source]
        source: StorageFailure,
    },

    /// The per-item worker failed. The item was not recorded.
    #[error("worker failed on item {item}: {source}")]
    Worker {
        item: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("item source failed: {0}")]
    Source(#[source] anyhow::Error),

    #[error("checkpoint handler: {0}")]
    Checkpoint(String),

    #[error("config error: {0}")]
    Config(String),
}

/// Underlying cause of an [`Error::Storage`].
#[derive(Debug, Error)]
pub enum StorageFailure {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn storage(resource: impl Into<String>, source: impl Into<StorageFailure>) -> Self {
        Error::Storage {
            resource: resource.into(),
            source: source.into(),
        }
    }

    /// True for errors raised by the worker rather than the engine.
    pub fn is_worker(&self) -> bool {
        matches!(self, Error::Worker { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
