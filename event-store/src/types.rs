//! Stored row shapes that do not leave this crate as-is

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stake_core::{Address, EventRow, IdentityPair, TxHash};
use std::collections::HashSet;

/// Unstake finalization before the withdrawer is resolved
///
/// `recipient` is the address the funds went to: the withdrawer itself for
/// wallet-direct stakes, or a vault for delegated ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUnstakeRow {
    /// Attester address
    pub attester: Address,

    /// Recipient of the withdrawn funds
    pub recipient: Address,

    /// Block timestamp
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,

    /// Block number
    pub block_number: u64,

    /// Log index within the block
    pub log_index: u64,

    /// Transaction hash
    pub tx_hash: TxHash,
}

impl RawUnstakeRow {
    /// Resolve into a row for `withdrawer`
    pub fn resolve(&self, withdrawer: Address) -> EventRow {
        EventRow {
            attester: self.attester.clone(),
            withdrawer,
            timestamp: self.timestamp,
            block_number: self.block_number,
            log_index: self.log_index,
            tx_hash: self.tx_hash.clone(),
        }
    }
}

/// Vault owned by a delegator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultPosition {
    /// Vault address (receives funds on unstake)
    pub vault: Address,

    /// Owner of the vault, i.e. the effective withdrawer
    pub owner: Address,
}

/// Resolve raw unstakes against the requested pairs
///
/// Two branches, evaluated independently:
/// - wallet-direct: `recipient` is the withdrawer
/// - delegation: `recipient` is a vault whose owner is the withdrawer
///
/// A raw row matching both branches, or several vault records, yields one
/// resolved row per match.
pub(crate) fn join_unstakes<'a, I, F>(
    pairs: &HashSet<IdentityPair>,
    raw: I,
    owners_of: F,
) -> Vec<EventRow>
where
    I: IntoIterator<Item = &'a RawUnstakeRow>,
    F: Fn(&Address) -> Vec<Address>,
{
    let mut rows = Vec::new();

    for unstake in raw {
        let direct = IdentityPair::new(unstake.attester.clone(), unstake.recipient.clone());
        if pairs.contains(&direct) {
            rows.push(unstake.resolve(unstake.recipient.clone()));
        }

        for owner in owners_of(&unstake.recipient) {
            let delegated = IdentityPair::new(unstake.attester.clone(), owner.clone());
            if pairs.contains(&delegated) {
                rows.push(unstake.resolve(owner));
            }
        }
    }

    rows
}
