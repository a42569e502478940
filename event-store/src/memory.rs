//! In-memory event store

use crate::{
    error::Result,
    types::{join_unstakes, RawUnstakeRow, VaultPosition},
    StakeEventSink, StakeEventStore,
};
use async_trait::async_trait;
use stake_core::{Address, EventRow, IdentityPair};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of both store traits
///
/// Cloning yields another handle onto the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    /// Successful registrations
    registrations: Arc<RwLock<Vec<EventRow>>>,

    /// Failed registrations
    failures: Arc<RwLock<Vec<EventRow>>>,

    /// Unstake finalizations, unresolved
    unstakes: Arc<RwLock<Vec<RawUnstakeRow>>>,

    /// Vault positions
    vault_positions: Arc<RwLock<Vec<VaultPosition>>>,
}

impl InMemoryEventStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn select(rows: &[EventRow], pairs: &[IdentityPair]) -> Vec<EventRow> {
        let wanted: HashSet<&IdentityPair> = pairs.iter().collect();
        rows.iter()
            .filter(|row| wanted.contains(&row.pair()))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StakeEventStore for InMemoryEventStore {
    async fn successful_registrations(&self, pairs: &[IdentityPair]) -> Result<Vec<EventRow>> {
        Ok(Self::select(&self.registrations.read().await, pairs))
    }

    async fn failed_registrations(&self, pairs: &[IdentityPair]) -> Result<Vec<EventRow>> {
        Ok(Self::select(&self.failures.read().await, pairs))
    }

    async fn unstake_finalizations(&self, pairs: &[IdentityPair]) -> Result<Vec<EventRow>> {
        let wanted: HashSet<IdentityPair> = pairs.iter().cloned().collect();
        let unstakes = self.unstakes.read().await;
        let vaults = self.vault_positions.read().await;

        let owners_of = |recipient: &Address| -> Vec<Address> {
            vaults
                .iter()
                .filter(|position| &position.vault == recipient)
                .map(|position| position.owner.clone())
                .collect()
        };

        Ok(join_unstakes(&wanted, unstakes.iter(), owners_of))
    }
}

#[async_trait]
impl StakeEventSink for InMemoryEventStore {
    async fn record_registration(&self, row: EventRow) -> Result<()> {
        self.registrations.write().await.push(row);
        Ok(())
    }

    async fn record_registration_failure(&self, row: EventRow) -> Result<()> {
        self.failures.write().await.push(row);
        Ok(())
    }

    async fn record_unstake(&self, row: RawUnstakeRow) -> Result<()> {
        self.unstakes.write().await.push(row);
        Ok(())
    }

    async fn record_vault_position(&self, position: VaultPosition) -> Result<()> {
        self.vault_positions.write().await.push(position);
        Ok(())
    }
}
