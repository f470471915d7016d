//! Source Binding Error Hierarchy
//!
//! Defines the error types surfaced by the binding store, categorized by the
//! layer that produced them: the store transport, the value codec, and the
//! binding/config join.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Communication failures with the key-value store
    #[error(transparent)]
    Transport(#[from] StoreError),

    /// Stored value or key does not match the expected shape
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A live binding exists but its source has no configuration
    #[error("source bound {source_id} for worker {worker} doesn't have related source config in store")]
    ConfigMissing { worker: String, source_id: String },

    /// The binding kept changing between the lookup and the joint read
    #[error("source bound for worker {worker} changed during {attempts} consecutive reads")]
    BoundUnstable { worker: String, attempts: usize },

    /// Caller supplied an argument the operation cannot act on
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// True for failures talking to the store; the caller owns the retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_))
    }

    /// True when a binding points at a source with no configuration.
    pub fn is_config_missing(&self) -> bool {
        matches!(self, Error::ConfigMissing { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Request did not complete within the store client's deadline
    #[error("Store request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection to the store was lost
    #[error("Store connection lost: {0}")]
    ConnectionLost(String),

    /// Store refused the request (not serving, shutting down)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Requested revision is older than the store's compaction point
    #[error("Required revision {requested} has been compacted, compact revision is {compact_revision}")]
    Compacted { requested: i64, compact_revision: i64 },

    /// Watch consumer fell behind the store's event stream
    #[error("Watch stream lagged behind by {0} event batches")]
    WatchLagged(u64),

    /// Store answered with a response that does not fit the request
    #[error("Unexpected store response: {0}")]
    UnexpectedResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Binding value is not a `{"source":..,"worker":..}` object
    #[error("Malformed source bound value {raw:?}: {source}")]
    SourceBound {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// Source configuration value cannot be parsed
    #[error("Malformed source config value under {key}: {source}")]
    SourceConfig {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Key does not belong to the namespace it was read from
    #[error("Key {key} is outside of namespace {prefix}")]
    UnexpectedKey { key: String, prefix: String },

    /// Binding value names a different worker than the key it is stored under
    #[error("Source bound under {key} names worker {worker}")]
    WorkerMismatch { key: String, worker: String },
}
