//! Configuration of a filesystem-backed cache.
//!
//! Values are read from an optional TOML file and `SHARDCACHE_*` environment variables (nested
//! keys separated by `__`), the latter taking precedence.

use crate::shard::ShardScheme;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, Map, Source};
use std::borrow::Cow;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

pub const DEFAULT_CACHE_PATH: &str = "/var/cache/shardcache";

#[derive(Clone, Debug, serde::Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding the shard files.
    pub path: PathBuf,
    /// Number of shards keys are distributed over.
    pub shard_buckets: NonZeroU32,
}

impl CacheConfig {
    /// Loads the configuration from `file` and the environment.
    ///
    /// Without an explicit `file`, the file named by `SHARDCACHE_CONFIG_FILE` or
    /// `/etc/shardcache/config.toml` is read if it exists.
    pub fn load(file: Option<&Path>) -> Result<Self, LoadConfigError> {
        ConfigLoader::new().add_default_sources(file).load()
    }

    pub fn scheme(&self) -> ShardScheme {
        ShardScheme::new(self.shard_buckets)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadConfigError {
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

pub struct ConfigLoader(ConfigBuilder<DefaultState>);

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        ConfigLoader(Config::builder())
    }

    pub fn add_default_sources(self, file: Option<&Path>) -> Self {
        let file = match file {
            Some(file) => File::from(file).required(true),
            None => File::with_name(
                &std::env::var("SHARDCACHE_CONFIG_FILE")
                    .map(Cow::Owned)
                    .unwrap_or(Cow::Borrowed("/etc/shardcache/config.toml")),
            )
            .required(false),
        };
        self.add_file_source(file).add_environment_source(None)
    }

    pub fn add_file_source<T, F>(mut self, file: File<T, F>) -> Self
    where
        File<T, F>: Source + Send + Sync + 'static,
    {
        self.0 = self.0.add_source(file);
        self
    }

    /// Adds `SHARDCACHE_*` variables, read from `source` instead of the process environment if
    /// given.
    pub fn add_environment_source(mut self, source: Option<Map<String, String>>) -> Self {
        self.0 = self.0.add_source(
            Environment::with_prefix("SHARDCACHE")
                .separator("__")
                .prefix_separator("_")
                .try_parsing(true)
                .source(source),
        );
        self
    }

    pub fn load(self) -> Result<CacheConfig, LoadConfigError> {
        self.0
            .set_default("path", DEFAULT_CACHE_PATH)?
            .set_default("shard_buckets", i64::from(ShardScheme::DEFAULT_BUCKETS.get()))?
            .build()?
            .try_deserialize()
            .map_err(LoadConfigError::from)
    }
}
