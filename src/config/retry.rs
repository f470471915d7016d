use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// How many times the binding/config join re-reads when the binding
    /// moves underneath it
    #[serde(default = "default_get_bound_config_attempts")]
    pub get_bound_config_attempts: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            get_bound_config_attempts: default_get_bound_config_attempts(),
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.get_bound_config_attempts == 0 {
            return Err(Error::InvalidConfig(
                "get_bound_config_attempts must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_get_bound_config_attempts() -> usize {
    3
}
