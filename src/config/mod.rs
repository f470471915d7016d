//! Configuration management for the binding store.
//!
//! Provides hierarchical configuration loading with priority:
//! 1. Default values (hardcoded)
//! 2. Config file named by `CONFIG_PATH`
//! 3. Runtime override files (`with_override_config`)
//! 4. Environment variables with `BOUND__` prefix (highest priority)

mod keyspace;
mod retry;
mod watch;
pub use keyspace::*;
pub use retry::*;
pub use watch::*;


//---
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

const ENV_PREFIX: &str = "BOUND";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Store key layout for bindings and source configs
    #[serde(default)]
    pub keyspace: KeyspaceConfig,
    /// Channel sizing for spawned watches
    #[serde(default)]
    pub watch: WatchConfig,
    /// Retry limits for multi-step reads
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Settings {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Sources are merged in order, later ones overriding earlier:
    /// 1. Type defaults
    /// 2. File from the `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `BOUND__` prefix
    ///
    /// Callers MUST call `validate()` once all overrides are applied.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("BOUND__WATCH__BOUND_CHANNEL_CAPACITY", "64");
    /// let settings = Settings::new()?;
    /// settings.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let settings: Self = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Applies overrides from an additional file; environment variables are
    /// re-applied on top so they keep the highest priority.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let settings: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Validates all sections
    pub fn validate(&self) -> Result<()> {
        self.keyspace.validate()?;
        self.watch.validate()?;
        self.retry.validate()?;
        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
