//! JSON snapshots for offline reconciliation
//!
//! A snapshot carries raw outcome rows, vault positions and the attempts to
//! reconcile. It seeds any [`StakeEventSink`] before a run.

use crate::{cache::ProviderMetadata, positions::StakeAmount, Result};
use event_store::{RawUnstakeRow, StakeEventSink, VaultPosition};
use serde::{Deserialize, Serialize};
use stake_core::{Address, EventRow, StakeAttempt, TokenAmount};
use std::collections::HashMap;
use std::path::Path;

/// Payload carried by snapshot attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePayload {
    /// Staked amount in base units, as a decimal string
    #[serde(with = "ethnum::serde::decimal")]
    pub amount: TokenAmount,

    /// Provider delegated to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Address>,
}

impl StakeAmount for StakePayload {
    fn amount(&self) -> TokenAmount {
        self.amount
    }

    fn provider(&self) -> Option<&Address> {
        self.provider.as_ref()
    }
}

/// Provider metadata entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Provider address
    pub address: Address,

    /// Display metadata
    #[serde(flatten)]
    pub metadata: ProviderMetadata,
}

/// Reconciliation input snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Successful registrations
    pub registrations: Vec<EventRow>,

    /// Failed registrations
    pub failures: Vec<EventRow>,

    /// Unstake finalizations with unresolved recipients
    pub unstakes: Vec<RawUnstakeRow>,

    /// Vault ownership records
    pub vault_positions: Vec<VaultPosition>,

    /// Attempts to reconcile
    pub attempts: Vec<StakeAttempt<StakePayload>>,

    /// Provider display metadata
    pub providers: Vec<ProviderEntry>,

    /// Registered validator keys per provider
    pub registered_keys: HashMap<Address, u64>,
}

impl Snapshot {
    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write every stored row into `sink`
    pub async fn seed<S>(&self, sink: &S) -> Result<()>
    where
        S: StakeEventSink + ?Sized,
    {
        for row in &self.registrations {
            sink.record_registration(row.clone()).await?;
        }
        for row in &self.failures {
            sink.record_registration_failure(row.clone()).await?;
        }
        for position in &self.vault_positions {
            sink.record_vault_position(position.clone()).await?;
        }
        for row in &self.unstakes {
            sink.record_unstake(row.clone()).await?;
        }

        tracing::info!(
            registrations = self.registrations.len(),
            failures = self.failures.len(),
            unstakes = self.unstakes.len(),
            vault_positions = self.vault_positions.len(),
            "Seeded event store from snapshot"
        );

        Ok(())
    }

    /// Provider metadata as cache entries
    pub fn provider_metadata(&self) -> impl Iterator<Item = (Address, ProviderMetadata)> + '_ {
        self.providers
            .iter()
            .map(|entry| (entry.address.clone(), entry.metadata.clone()))
    }
}
