//! Stake Core
//!
//! Shared data model for stake-outcome reconciliation.
//!
//! # Model
//!
//! - **Identity pair**: `(attester, withdrawer)`, both canonical lowercase
//!   addresses. The pair is the key that scopes every reconciliation.
//! - **Event rows**: successful registrations, failed registrations and
//!   unstake finalizations as recorded by storage.
//! - **Stake attempts**: caller-owned records, generic over an opaque payload.
//! - **Timeline events**: rows classified into `Success`, `Failure(reason)`
//!   or `Unstake`.
//! - **Resolved outcomes**: the status attached to an attempt after matching.
//!
//! # Invariants
//!
//! - Chronology is `(block_number, log_index)`, nothing else
//! - Addresses and tx hashes are canonical from construction onwards
//! - Amounts are 256-bit integers, never floating point

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod error;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    Address, AttemptKind, ChainPosition, EventRecord, EventRow, FailureReason, IdentityPair,
    ResolvedAttempt, ResolvedOutcome, StakeAttempt, StakeStatus, TimelineEvent, TokenAmount,
    TxHash,
};
pub use types::parse_amount;
