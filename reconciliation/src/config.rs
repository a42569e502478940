//! Configuration for the reconciliation service

use event_store::{StoreBackend, StoreConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reconciliation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Default log directive, used when `RUST_LOG` is unset
    pub log_filter: String,

    /// Event store configuration
    pub store: StoreConfig,

    /// Provider metadata cache configuration
    pub provider_cache: ProviderCacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "stake-reconciler".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_filter: "info".to_string(),
            store: StoreConfig::default(),
            provider_cache: ProviderCacheConfig::default(),
        }
    }
}

/// Provider metadata cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderCacheConfig {
    /// Entry lifetime in seconds
    pub ttl_seconds: u64,
}

impl Default for ProviderCacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300, // 5 minutes
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(backend) = std::env::var("RECONCILER_STORE_BACKEND") {
            config.store.backend = StoreBackend::parse(&backend).ok_or_else(|| {
                crate::Error::Config(format!("Unknown store backend: {}", backend))
            })?;
        }

        if let Ok(dir) = std::env::var("RECONCILER_DATA_DIR") {
            config.store.data_dir = PathBuf::from(dir);
        }

        if let Ok(filter) = std::env::var("RECONCILER_LOG_FILTER") {
            config.log_filter = filter;
        }

        if let Ok(ttl) = std::env::var("RECONCILER_PROVIDER_CACHE_TTL_SECS") {
            config.provider_cache.ttl_seconds = ttl.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid provider cache TTL {}: {}", ttl, e))
            })?;
        }

        Ok(config)
    }
}
