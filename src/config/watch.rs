use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Channel sizing for watches started through `BindingStore::spawn_source_bound_watch`.
///
/// Callers that drive `watch_source_bound` directly own their channels and
/// ignore these values.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Buffered binding notifications before the watch task waits on the consumer
    #[serde(default = "default_bound_channel_capacity")]
    pub bound_channel_capacity: usize,

    /// Buffered errors before the watch task waits on the consumer
    #[serde(default = "default_error_channel_capacity")]
    pub error_channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            bound_channel_capacity: default_bound_channel_capacity(),
            error_channel_capacity: default_error_channel_capacity(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bound_channel_capacity == 0 {
            return Err(Error::InvalidConfig(
                "bound_channel_capacity must be greater than 0".into(),
            ));
        }
        if self.error_channel_capacity == 0 {
            return Err(Error::InvalidConfig(
                "error_channel_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_bound_channel_capacity() -> usize {
    10
}
fn default_error_channel_capacity() -> usize {
    10
}
