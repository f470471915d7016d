use std::fmt;

use bytes::Bytes;
use serde::Deserialize;

use crate::DecodeError;

/// The assignment of a replication source to a worker.
///
/// Only `source_id` and `worker_id` are persisted. `is_deleted` and
/// `revision` describe the store event or read the record came from and are
/// filled in by whoever builds the record from store data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourceBound {
    #[serde(rename = "source")]
    pub source_id: String,

    #[serde(rename = "worker")]
    pub worker_id: String,

    /// Tombstone: the binding was removed, not "never existed"
    #[serde(skip)]
    pub is_deleted: bool,

    /// Store revision at which this record state became effective
    #[serde(skip)]
    pub revision: i64,
}

impl SourceBound {
    pub fn new(
        source_id: impl Into<String>,
        worker_id: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }

    /// True for the placeholder returned when a worker has no binding.
    pub fn is_empty(&self) -> bool {
        self.source_id.is_empty() && self.worker_id.is_empty()
    }

    /// Canonical JSON text, e.g. `{"source":"mysql-replica-1","worker":"dm-worker-1"}`.
    pub fn to_json(&self) -> String {
        // serde_json::Map keeps keys sorted, so the field order is stable.
        serde_json::json!({
            "source": self.source_id,
            "worker": self.worker_id,
        })
        .to_string()
    }

    pub fn encode(&self) -> Bytes {
        Bytes::from(self.to_json())
    }

    pub fn decode(value: &[u8]) -> std::result::Result<Self, DecodeError> {
        serde_json::from_slice(value).map_err(|source| DecodeError::SourceBound {
            raw: String::from_utf8_lossy(value).into_owned(),
            source,
        })
    }

    /// Tombstone for `worker_id`; the source is unknown at delete time.
    pub(crate) fn tombstone(
        worker_id: String,
        revision: i64,
    ) -> Self {
        Self {
            source_id: String::new(),
            worker_id,
            is_deleted: true,
            revision,
        }
    }
}

impl fmt::Display for SourceBound {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}
