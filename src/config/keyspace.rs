use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_BOUND_PREFIX;
use crate::constants::DEFAULT_LAST_BOUND_PREFIX;
use crate::constants::DEFAULT_SOURCE_CONFIG_PREFIX;
use crate::DecodeError;
use crate::Error;
use crate::Result;

/// Store key layout.
///
/// Each collection lives under its own prefix; the record identifier is
/// appended verbatim, so `/dm-master/bound-worker/` + `dm-worker-1` addresses
/// the binding of worker `dm-worker-1`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KeyspaceConfig {
    /// Namespace of live bindings, keyed by worker
    #[serde(default = "default_bound_prefix")]
    pub bound_prefix: String,

    /// Namespace of the most recent binding of each worker, kept across deletes
    #[serde(default = "default_last_bound_prefix")]
    pub last_bound_prefix: String,

    /// Namespace of source configurations, keyed by source
    #[serde(default = "default_source_config_prefix")]
    pub source_config_prefix: String,
}

impl Default for KeyspaceConfig {
    fn default() -> Self {
        Self {
            bound_prefix: default_bound_prefix(),
            last_bound_prefix: default_last_bound_prefix(),
            source_config_prefix: default_source_config_prefix(),
        }
    }
}

impl KeyspaceConfig {
    pub fn validate(&self) -> Result<()> {
        let prefixes = [
            ("bound_prefix", &self.bound_prefix),
            ("last_bound_prefix", &self.last_bound_prefix),
            ("source_config_prefix", &self.source_config_prefix),
        ];

        for (name, prefix) in prefixes.iter() {
            if prefix.is_empty() {
                return Err(Error::InvalidConfig(format!("{name} cannot be empty")));
            }
            if !prefix.ends_with('/') {
                return Err(Error::InvalidConfig(format!(
                    "{name} {prefix:?} must end with '/'"
                )));
            }
        }

        // A prefix nested in another would make range scans overlap.
        for (i, (name_a, a)) in prefixes.iter().enumerate() {
            for (name_b, b) in prefixes.iter().skip(i + 1) {
                if a.starts_with(b.as_str()) || b.starts_with(a.as_str()) {
                    return Err(Error::InvalidConfig(format!(
                        "{name_a} {a:?} and {name_b} {b:?} overlap"
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn bound_key(
        &self,
        worker: &str,
    ) -> String {
        format!("{}{}", self.bound_prefix, worker)
    }

    pub fn last_bound_key(
        &self,
        worker: &str,
    ) -> String {
        format!("{}{}", self.last_bound_prefix, worker)
    }

    pub fn source_config_key(
        &self,
        source: &str,
    ) -> String {
        format!("{}{}", self.source_config_prefix, source)
    }

    /// Recovers the worker identifier from a binding key.
    pub fn worker_from_bound_key(
        &self,
        key: &[u8],
    ) -> std::result::Result<String, DecodeError> {
        id_from_key(&self.bound_prefix, key)
    }
}

/// Strips `prefix` from `key`, leaving the record identifier.
pub(crate) fn id_from_key(
    prefix: &str,
    key: &[u8],
) -> std::result::Result<String, DecodeError> {
    let key = String::from_utf8_lossy(key);
    match key.strip_prefix(prefix) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(DecodeError::UnexpectedKey {
            key: key.into_owned(),
            prefix: prefix.to_string(),
        }),
    }
}

fn default_bound_prefix() -> String {
    DEFAULT_BOUND_PREFIX.to_string()
}
fn default_last_bound_prefix() -> String {
    DEFAULT_LAST_BOUND_PREFIX.to_string()
}
fn default_source_config_prefix() -> String {
    DEFAULT_SOURCE_CONFIG_PREFIX.to_string()
}
