//! Configuration for the event store

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local, lost on exit
    Memory,
    /// RocksDB under `data_dir`
    #[serde(rename = "rocksdb")]
    RocksDb,
}

impl StoreBackend {
    /// Parse from a config/env string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Some(StoreBackend::Memory),
            "rocksdb" | "rocks" => Some(StoreBackend::RocksDb),
            _ => None,
        }
    }
}

/// Event store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend
    pub backend: StoreBackend,

    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            data_dir: PathBuf::from("./data/stake-events"),
            write_buffer_size_mb: 64,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}
