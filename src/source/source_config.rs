use std::collections::BTreeMap;
use std::collections::HashMap;

use autometrics::autometrics;
use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::BindingStore;
use crate::DecodeError;
use crate::Error;
use crate::KeyScope;
use crate::KeyValue;
use crate::KvStore;
use crate::Op;
use crate::Result;
use crate::Txn;
use crate::API_SLO;

/// Configuration of one replication source.
///
/// Only the identifier is interpreted here; every other field is kept as-is
/// so configurations written by newer controllers survive a round trip.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(rename = "source-id")]
    pub source_id: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SourceConfig {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Sets an opaque field, e.g. `enable-gtid` or `from`.
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    pub fn to_json(&self) -> String {
        let mut map = serde_json::Map::new();
        for (name, value) in self.extra.iter() {
            map.insert(name.clone(), value.clone());
        }
        map.insert("source-id".to_string(), Value::String(self.source_id.clone()));
        Value::Object(map).to_string()
    }
}

impl<S: KvStore> BindingStore<S> {
    /// Writes the configuration of `config.source_id`, replacing any previous one.
    #[autometrics(objective = API_SLO)]
    pub async fn put_source_config(
        &self,
        config: &SourceConfig,
    ) -> Result<i64> {
        if config.source_id.is_empty() {
            return Err(Error::InvalidArgument("source cannot be empty".into()));
        }
        let key = self.keyspace().source_config_key(&config.source_id);
        let resp = self
            .store()
            .txn(Txn::new().and_then([Op::put(key, config.to_json())]))
            .await?;
        debug!(source = %config.source_id, revision = resp.revision, "Source config put");
        Ok(resp.revision)
    }

    /// Reads the configuration of `source`, or every configuration when empty.
    #[autometrics(objective = API_SLO)]
    pub async fn get_source_config(
        &self,
        source: &str,
    ) -> Result<(HashMap<String, SourceConfig>, i64)> {
        let (key, scope) = if source.is_empty() {
            (self.keyspace().source_config_prefix.clone(), KeyScope::Prefix)
        } else {
            (self.keyspace().source_config_key(source), KeyScope::Exact)
        };

        let resp = self.store().range(Bytes::from(key), scope).await?;
        Ok((
            source_configs_from_kvs(resp.kvs)?,
            resp.revision,
        ))
    }

    /// Removes the configuration of `source`. Succeeds when there is none.
    #[autometrics(objective = API_SLO)]
    pub async fn delete_source_config(
        &self,
        source: &str,
    ) -> Result<i64> {
        if source.is_empty() {
            return Err(Error::InvalidArgument("source cannot be empty".into()));
        }
        let key = self.keyspace().source_config_key(source);
        let resp = self.store().txn(Txn::new().and_then([Op::delete(key)])).await?;
        debug!(source, revision = resp.revision, "Source config deleted");
        Ok(resp.revision)
    }
}

pub(crate) fn source_configs_from_kvs(kvs: Vec<KeyValue>) -> Result<HashMap<String, SourceConfig>> {
    let mut configs = HashMap::with_capacity(kvs.len());
    for kv in kvs {
        let config: SourceConfig =
            serde_json::from_slice(&kv.value).map_err(|source| DecodeError::SourceConfig {
                key: String::from_utf8_lossy(&kv.key).into_owned(),
                source,
            })?;
        configs.insert(config.source_id.clone(), config);
    }
    Ok(configs)
}
