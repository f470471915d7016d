//! KvStore
//!
//! The revisioned key-value contract the binding layer is written against.
//! Any strongly consistent store that can offer the following fits:
//! - a single, strictly increasing revision counter stamped on every mutation
//! - linearizable range reads reporting the revision they observed
//! - atomic multi-operation transactions guarded by compare conditions
//! - an ordered watch stream that replays history from a given revision and
//!   then follows live mutations

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
#[cfg(test)]
use mockall::automock;

use super::Txn;
use super::TxnResponse;
use crate::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Ordered stream of watch batches. An `Err` item ends the stream.
pub type WatchStream = BoxStream<'static, StoreResult<WatchResponse>>;

/// Whether a key addresses one entry or every entry sharing it as a prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    Exact,
    Prefix,
}

impl KeyScope {
    pub fn matches(
        self,
        key: &[u8],
        candidate: &[u8],
    ) -> bool {
        match self {
            KeyScope::Exact => candidate == key,
            KeyScope::Prefix => candidate.starts_with(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyValue {
    pub key: Bytes,
    pub value: Bytes,
    /// Revision of the put that created the key; 0 for a deleted key
    pub create_revision: i64,
    /// Revision of the last mutation of the key
    pub mod_revision: i64,
    /// Number of puts since creation
    pub version: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Put,
    Delete,
}

/// One mutation of one key.
///
/// For `Delete` the value is empty and `kv.mod_revision` is the revision of
/// the delete itself; the value that existed before is not carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: EventType,
    pub kv: KeyValue,
}

impl Event {
    pub fn revision(&self) -> i64 {
        self.kv.mod_revision
    }
}

/// Events committed at one store revision, in commit order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchResponse {
    pub revision: i64,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RangeResponse {
    pub kvs: Vec<KeyValue>,
    /// Store revision the read was served at
    pub revision: i64,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Linearizable read of one key or a key prefix
    async fn range(
        &self,
        key: Bytes,
        scope: KeyScope,
    ) -> StoreResult<RangeResponse>;

    /// Atomically evaluate `txn.compares` and apply either the success or
    /// the failure branch. All writes of the branch share one new revision.
    async fn txn(
        &self,
        txn: Txn,
    ) -> StoreResult<TxnResponse>;

    /// Watch one key or a key prefix.
    ///
    /// With `start_revision > 0` every matching event at or after that
    /// revision is replayed before live events follow; with
    /// `start_revision <= 0` only mutations after the call are delivered.
    async fn watch(
        &self,
        key: Bytes,
        scope: KeyScope,
        start_revision: i64,
    ) -> StoreResult<WatchStream>;
}
