//! Error types of the cache engine and the pool-facing API.

use crate::shard::ShardId;
use std::io;

/// Result of engine level operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// An I/O error reported by a [Storage](crate::storage::Storage), together with the name of the
/// blob it occurred on.
#[derive(Debug, thiserror::Error)]
#[error("storage error on {path}: {error}")]
pub struct StorageError {
    #[source]
    error: io::Error,
    path: String,
}

impl StorageError {
    pub fn new(error: io::Error, path: impl Into<String>) -> Self {
        Self {
            error,
            path: path.into(),
        }
    }

    pub fn io_error(&self) -> &io::Error {
        &self.error
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Attaches the affected storage path to an [io::Result].
pub trait WithPath<T> {
    fn with_path(self, path: impl Into<String>) -> Result<T, StorageError>;
}

impl<T> WithPath<T> for io::Result<T> {
    fn with_path(self, path: impl Into<String>) -> Result<T, StorageError> {
        self.map_err(|e| StorageError::new(e, path))
    }
}

/// A shard's bytes could not be turned back into entries.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed shard data: {0}")]
    Malformed(#[source] rkyv::rancor::Error),
    #[error("unsupported shard format version {0}")]
    UnsupportedVersion(u16),
    #[error("expiration timestamp out of range for key {0:?}")]
    InvalidTimestamp(String),
}

/// Errors raised by the cache engine.
///
/// The engine never recovers from any of these on its own; they are always propagated to the
/// caller.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to decode shard {shard}: {source}")]
    Decode {
        shard: ShardId,
        #[source]
        source: DecodeError,
    },
    #[error("failed to encode shard {shard}: {source}")]
    Encode {
        shard: ShardId,
        #[source]
        source: rkyv::rancor::Error,
    },
}

/// Errors of the pool-facing API.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The caller passed an argument that is rejected before any storage access.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A read could not be answered by the engine.
    #[error("an unexpected error has occurred: {0}")]
    General(#[source] CacheError),
    /// A typed value could not be converted to or from its stored JSON form.
    #[error("invalid item value: {0}")]
    Value(#[source] serde_json::Error),
}

impl From<CacheError> for PoolError {
    fn from(value: CacheError) -> Self {
        PoolError::General(value)
    }
}
