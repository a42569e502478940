//! Stake Event Store
//!
//! Read-side storage collaborator for reconciliation, plus the write-side
//! sink used to seed it.
//!
//! # Collections
//!
//! - Successful validator registrations
//! - Failed validator registrations
//! - Unstake finalizations, joined against vault positions on read
//!
//! # Backends
//!
//! - [`InMemoryEventStore`] for tests and snapshot replays
//! - [`RocksEventStore`] for a persistent local index
//!
//! Reads never retry. A failed read is returned to the caller as is.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod memory;
pub mod rocks;
pub mod types;

use async_trait::async_trait;
use stake_core::{EventRow, IdentityPair};
use std::sync::Arc;

// Re-exports
pub use config::{StoreBackend, StoreConfig};
pub use error::{Error, Result};
pub use memory::InMemoryEventStore;
pub use rocks::{RocksEventStore, StoreStats};
pub use types::{RawUnstakeRow, VaultPosition};

/// Read access to the three outcome collections
///
/// Every method returns the rows for the given pairs only, in no particular
/// order. Callers impose their own chronology.
#[async_trait]
pub trait StakeEventStore: Send + Sync {
    /// Successful validator registrations
    async fn successful_registrations(&self, pairs: &[IdentityPair]) -> Result<Vec<EventRow>>;

    /// Failed validator registrations
    async fn failed_registrations(&self, pairs: &[IdentityPair]) -> Result<Vec<EventRow>>;

    /// Unstake finalizations with the effective withdrawer resolved
    ///
    /// A finalization reachable through more than one join branch is
    /// returned once per branch.
    async fn unstake_finalizations(&self, pairs: &[IdentityPair]) -> Result<Vec<EventRow>>;
}

/// Write access used to seed a store
#[async_trait]
pub trait StakeEventSink: Send + Sync {
    /// Record a successful registration
    async fn record_registration(&self, row: EventRow) -> Result<()>;

    /// Record a failed registration
    async fn record_registration_failure(&self, row: EventRow) -> Result<()>;

    /// Record an unstake finalization (recipient not yet resolved)
    async fn record_unstake(&self, row: RawUnstakeRow) -> Result<()>;

    /// Record a vault position
    async fn record_vault_position(&self, position: VaultPosition) -> Result<()>;
}

/// Store selected by configuration
#[derive(Debug, Clone)]
pub enum EventStoreHandle {
    /// In-memory backend
    Memory(InMemoryEventStore),
    /// RocksDB backend
    Rocks(Arc<RocksEventStore>),
}

impl EventStoreHandle {
    /// Open the backend named in `config`
    pub fn open(config: &StoreConfig) -> Result<Self> {
        match config.backend {
            StoreBackend::Memory => {
                tracing::info!("Using in-memory event store");
                Ok(Self::Memory(InMemoryEventStore::new()))
            }
            StoreBackend::RocksDb => Ok(Self::Rocks(Arc::new(RocksEventStore::open(config)?))),
        }
    }
}

#[async_trait]
impl StakeEventStore for EventStoreHandle {
    async fn successful_registrations(&self, pairs: &[IdentityPair]) -> Result<Vec<EventRow>> {
        match self {
            Self::Memory(store) => store.successful_registrations(pairs).await,
            Self::Rocks(store) => store.successful_registrations(pairs).await,
        }
    }

    async fn failed_registrations(&self, pairs: &[IdentityPair]) -> Result<Vec<EventRow>> {
        match self {
            Self::Memory(store) => store.failed_registrations(pairs).await,
            Self::Rocks(store) => store.failed_registrations(pairs).await,
        }
    }

    async fn unstake_finalizations(&self, pairs: &[IdentityPair]) -> Result<Vec<EventRow>> {
        match self {
            Self::Memory(store) => store.unstake_finalizations(pairs).await,
            Self::Rocks(store) => store.unstake_finalizations(pairs).await,
        }
    }
}

#[async_trait]
impl StakeEventSink for EventStoreHandle {
    async fn record_registration(&self, row: EventRow) -> Result<()> {
        match self {
            Self::Memory(store) => store.record_registration(row).await,
            Self::Rocks(store) => store.record_registration(row).await,
        }
    }

    async fn record_registration_failure(&self, row: EventRow) -> Result<()> {
        match self {
            Self::Memory(store) => store.record_registration_failure(row).await,
            Self::Rocks(store) => store.record_registration_failure(row).await,
        }
    }

    async fn record_unstake(&self, row: RawUnstakeRow) -> Result<()> {
        match self {
            Self::Memory(store) => store.record_unstake(row).await,
            Self::Rocks(store) => store.record_unstake(row).await,
        }
    }

    async fn record_vault_position(&self, position: VaultPosition) -> Result<()> {
        match self {
            Self::Memory(store) => store.record_vault_position(position).await,
            Self::Rocks(store) => store.record_vault_position(position).await,
        }
    }
}
