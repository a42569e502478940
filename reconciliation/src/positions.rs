//! Position views derived from resolved attempts
//!
//! These are consumers of matching results. They never fail on inconsistent
//! data: a negative derived quantity is clamped to zero and logged.

use serde::Serialize;
use stake_core::{
    Address, FailureReason, IdentityPair, ResolvedAttempt, StakeStatus, TokenAmount,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Payloads that carry a stake amount
pub trait StakeAmount {
    /// Amount staked by the attempt, in base units
    fn amount(&self) -> TokenAmount;

    /// Provider delegated to, for delegation attempts
    fn provider(&self) -> Option<&Address> {
        None
    }
}

/// Counts and amounts per resolved status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionSummary {
    /// Attempts still waiting for an outcome
    pub pending: usize,

    /// Attempts registered and still staked
    pub staked: usize,

    /// Attempts registered and later withdrawn
    pub unstaked: usize,

    /// Failures on a pair that was not active
    pub failed_invalid_key: usize,

    /// Failures on a pair that was already active
    pub failed_duplicate: usize,

    /// Pending plus staked amount
    #[serde(with = "ethnum::serde::decimal")]
    pub active_amount: TokenAmount,

    /// Pending amount only
    #[serde(with = "ethnum::serde::decimal")]
    pub pending_amount: TokenAmount,

    /// Withdrawn amount
    #[serde(with = "ethnum::serde::decimal")]
    pub unstaked_amount: TokenAmount,
}

impl Default for PositionSummary {
    fn default() -> Self {
        Self {
            pending: 0,
            staked: 0,
            unstaked: 0,
            failed_invalid_key: 0,
            failed_duplicate: 0,
            active_amount: TokenAmount::ZERO,
            pending_amount: TokenAmount::ZERO,
            unstaked_amount: TokenAmount::ZERO,
        }
    }
}

/// Summarize resolved attempts
pub fn summarize<P: StakeAmount>(resolved: &[ResolvedAttempt<P>]) -> PositionSummary {
    let mut summary = PositionSummary::default();

    for entry in resolved {
        let amount = entry.attempt.payload.amount();
        match entry.status() {
            StakeStatus::Pending => {
                summary.pending += 1;
                summary.pending_amount = summary.pending_amount.saturating_add(amount);
                summary.active_amount = summary.active_amount.saturating_add(amount);
            }
            StakeStatus::Success => {
                summary.staked += 1;
                summary.active_amount = summary.active_amount.saturating_add(amount);
            }
            StakeStatus::Unstaked => {
                summary.unstaked += 1;
                summary.unstaked_amount = summary.unstaked_amount.saturating_add(amount);
            }
            StakeStatus::Failed => match entry.outcome.failure_reason {
                Some(FailureReason::Duplicate) => summary.failed_duplicate += 1,
                Some(FailureReason::InvalidKey) | None => summary.failed_invalid_key += 1,
            },
        }
    }

    summary
}

/// Provider capacity as seen from resolved delegations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderPosition {
    /// Provider address
    pub provider: Address,

    /// Delegations that are pending or staked
    pub active_delegations: u64,

    /// Amount behind those delegations
    #[serde(with = "ethnum::serde::decimal")]
    pub active_amount: TokenAmount,

    /// Validator keys the provider has registered
    pub registered_keys: u64,

    /// Registered keys not yet backing a delegation (never negative)
    pub available_keys: u64,

    /// Display metadata, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<crate::cache::ProviderMetadata>,
}

/// Build the provider roster
///
/// Every provider with an active delegation or a registered key count gets
/// an entry, sorted by address. `available_keys` is `registered - used`;
/// when delegations outnumber keys the estimate is clamped to zero.
pub fn provider_roster<P: StakeAmount>(
    resolved: &[ResolvedAttempt<P>],
    registered_keys: &HashMap<Address, u64>,
) -> Vec<ProviderPosition> {
    let mut usage: BTreeMap<Address, (u64, TokenAmount)> = registered_keys
        .keys()
        .map(|provider| (provider.clone(), (0, TokenAmount::ZERO)))
        .collect();

    for entry in resolved.iter().filter(|entry| entry.status().is_active()) {
        if let Some(provider) = entry.attempt.payload.provider() {
            let slot = usage
                .entry(provider.clone())
                .or_insert((0, TokenAmount::ZERO));
            slot.0 += 1;
            slot.1 = slot.1.saturating_add(entry.attempt.payload.amount());
        }
    }

    usage
        .into_iter()
        .map(|(provider, (used, amount))| {
            let registered = registered_keys.get(&provider).copied().unwrap_or(0);
            let available = match registered.checked_sub(used) {
                Some(available) => available,
                None => {
                    tracing::warn!(
                        provider = %provider,
                        registered,
                        used,
                        "Provider has more active delegations than registered keys, clamping to zero"
                    );
                    0
                }
            };

            ProviderPosition {
                provider,
                active_delegations: used,
                active_amount: amount,
                registered_keys: registered,
                available_keys: available,
                metadata: None,
            }
        })
        .collect()
}

/// Network-wide totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkTotals {
    /// Distinct pairs with a staked attempt
    pub active_validators: usize,

    /// Distinct providers behind staked delegations
    pub active_providers: usize,

    /// Staked amount (excludes pending)
    #[serde(with = "ethnum::serde::decimal")]
    pub total_staked: TokenAmount,
}

/// Compute network totals from staked attempts only
pub fn network_totals<P: StakeAmount>(resolved: &[ResolvedAttempt<P>]) -> NetworkTotals {
    let staked: Vec<&ResolvedAttempt<P>> = resolved
        .iter()
        .filter(|entry| entry.status() == StakeStatus::Success)
        .collect();

    let validators: BTreeSet<IdentityPair> =
        staked.iter().map(|entry| entry.attempt.pair()).collect();
    let providers: BTreeSet<&Address> = staked
        .iter()
        .filter_map(|entry| entry.attempt.payload.provider())
        .collect();
    let total_staked = staked.iter().fold(TokenAmount::ZERO, |total, entry| {
        total.saturating_add(entry.attempt.payload.amount())
    });

    NetworkTotals {
        active_validators: validators.len(),
        active_providers: providers.len(),
        total_staked,
    }
}
