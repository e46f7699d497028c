//! Layered service configuration.
//!
//! Built-in defaults, then `federation.toml` (or the file given with `--config`),
//! then `FEDERATION_*` environment variables, with `__` separating nested keys
//! (`FEDERATION_TIMEOUTS__FILES_READ_MS=200000`).

use crate::error::{Error, Result};
use crate::harvest::generator::DEFAULT_GENERATED_RECORDS;
use crate::search::monitor::DEFAULT_PROBE_CONCURRENCY;
use crate::search::transport::{
    DEFAULT_CONNECTION_TIMEOUT_MS, DEFAULT_DATASETS_READ_TIMEOUT_MS, DEFAULT_FILES_READ_TIMEOUT_MS,
    TimeoutPolicy,
};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "federation.toml";
pub const ENV_PREFIX: &str = "FEDERATION_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub timeouts: TimeoutSettings,
    pub shards: ShardSettings,
    pub harvest: HarvestSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8090)),
        }
    }
}

/// The local/primary index backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub url: String,
    /// Timeout for update (add/delete) requests.
    pub update_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8983/solr".to_string(),
            update_timeout_ms: 30_000,
        }
    }
}

/// Search timeouts in milliseconds; 0 leaves the transport default in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub connection_ms: u64,
    pub datasets_read_ms: u64,
    pub files_read_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            connection_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            datasets_read_ms: DEFAULT_DATASETS_READ_TIMEOUT_MS,
            files_read_ms: DEFAULT_FILES_READ_TIMEOUT_MS,
        }
    }
}

impl TimeoutSettings {
    pub fn policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::from_millis(self.connection_ms, self.datasets_read_ms, self.files_read_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardSettings {
    /// Shard addresses (`host:port/path`) the registry starts with.
    pub initial: Vec<String>,
    /// Without a registry, failed queries are never pruned.
    pub registry_enabled: bool,
    pub probe_concurrency: usize,
}

impl Default for ShardSettings {
    fn default() -> Self {
        Self {
            initial: Vec::new(),
            registry_enabled: true,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestSettings {
    pub generator_records: usize,
    pub http_timeout_ms: u64,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            generator_records: DEFAULT_GENERATED_RECORDS,
            http_timeout_ms: 60_000,
        }
    }
}

impl HarvestSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

impl Settings {
    /// The provider stack; `file` replaces the default config file name.
    pub fn figment(file: Option<&Path>) -> Figment {
        let file = file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(file: Option<&Path>) -> Result<Self> {
        if let Some(file) = file
            && !file.exists()
        {
            return Err(Error::Config(format!(
                "config file {} does not exist",
                file.display()
            )));
        }

        let settings: Settings = Self::figment(file)
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.backend.url)
            .map_err(|e| Error::Config(format!("backend.url '{}': {}", self.backend.url, e)))?;
        if self.shards.probe_concurrency == 0 {
            return Err(Error::Config(
                "shards.probe_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
