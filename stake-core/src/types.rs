//! Core types for stake reconciliation
//!
//! All types are designed for:
//! - Canonical comparison (addresses and hashes are case-folded on entry)
//! - Deterministic ordering (`ChainPosition` is the only clock that matters)
//! - Exact arithmetic (`TokenAmount` for money)

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token amount in base units (256-bit, matches on-chain `uint256`)
pub type TokenAmount = ethnum::U256;

/// Parse a base-10 token amount
pub fn parse_amount(s: &str) -> Result<TokenAmount> {
    TokenAmount::from_str_radix(s.trim(), 10).map_err(|_| Error::InvalidAmount(s.to_string()))
}

fn is_hex_with_prefix(s: &str, digits: usize) -> bool {
    s.len() == digits + 2
        && (s.starts_with("0x") || s.starts_with("0X"))
        && s[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// Canonical account address (`0x` + 40 lowercase hex digits)
///
/// Checksummed presentation form is produced outside this workspace; inside,
/// every address is case-folded so it can be used directly as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and canonicalize an address
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if !is_hex_with_prefix(s, 40) {
            return Err(Error::InvalidAddress(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical transaction hash (`0x` + 64 lowercase hex digits)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    /// Parse and canonicalize a transaction hash
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if !is_hex_with_prefix(s, 64) {
            return Err(Error::InvalidTxHash(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TxHash {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TxHash> for String {
    fn from(hash: TxHash) -> Self {
        hash.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `(attester, withdrawer)` identity pair
///
/// Both halves are canonical, so the pair doubles as the map key for
/// timelines and consumption tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityPair {
    /// Validator attester address
    pub attester: Address,

    /// Address entitled to withdraw the stake
    pub withdrawer: Address,
}

impl IdentityPair {
    /// Create new pair
    pub fn new(attester: Address, withdrawer: Address) -> Self {
        Self {
            attester,
            withdrawer,
        }
    }

    /// Parse both halves
    pub fn parse(attester: &str, withdrawer: &str) -> Result<Self> {
        Ok(Self::new(Address::parse(attester)?, Address::parse(withdrawer)?))
    }
}

impl fmt::Display for IdentityPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.attester, self.withdrawer)
    }
}

/// Position of a log inside the chain
///
/// Ordered by block number, then log index. Log indices are unique within a
/// block, so two distinct logs never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainPosition {
    /// Block number
    pub block_number: u64,

    /// Log index within the block
    pub log_index: u64,
}

impl ChainPosition {
    /// Create new position
    pub fn new(block_number: u64, log_index: u64) -> Self {
        Self {
            block_number,
            log_index,
        }
    }
}

impl fmt::Display for ChainPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_number, self.log_index)
    }
}

/// Outcome row as returned by storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRow {
    /// Attester address
    pub attester: Address,

    /// Withdrawer address (effective withdrawer for unstake rows)
    pub withdrawer: Address,

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

impl EventRow {
    /// Identity pair this row belongs to
    pub fn pair(&self) -> IdentityPair {
        IdentityPair::new(self.attester.clone(), self.withdrawer.clone())
    }

    /// Chain position
    pub fn position(&self) -> ChainPosition {
        ChainPosition::new(self.block_number, self.log_index)
    }

    /// Strip the row down to what a timeline event keeps
    pub fn record(&self) -> EventRecord {
        EventRecord {
            timestamp: self.timestamp,
            position: self.position(),
            tx_hash: self.tx_hash.clone(),
        }
    }
}

/// How a stake attempt was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    /// Validator registered directly by its operator
    Direct,
    /// Stake delegated to a provider through a vault
    Delegation,
    /// Deposit made straight from a wallet
    WalletDirect,
}

/// One attempt to register a validator
///
/// `P` is whatever the caller needs to carry along (amount, provider, ...).
/// Reconciliation never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeAttempt<P> {
    /// Attester address
    pub attester: Address,

    /// Withdrawer address
    pub withdrawer: Address,

    /// Block timestamp of the attempt
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,

    /// Block number of the attempt
    pub block_number: u64,

    /// Log index of the attempt
    pub log_index: u64,

    /// Attempt kind, when the caller knows it
    #[serde(default)]
    pub kind: Option<AttemptKind>,

    /// Caller payload
    pub payload: P,
}

impl<P> StakeAttempt<P> {
    /// Identity pair this attempt belongs to
    pub fn pair(&self) -> IdentityPair {
        IdentityPair::new(self.attester.clone(), self.withdrawer.clone())
    }

    /// Chain position
    pub fn position(&self) -> ChainPosition {
        ChainPosition::new(self.block_number, self.log_index)
    }
}

/// Inferred cause of a failed registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// Pair was not active when the failure happened
    InvalidKey,
    /// Pair was already active when the failure happened
    Duplicate,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::InvalidKey => write!(f, "INVALID_KEY"),
            FailureReason::Duplicate => write!(f, "DUPLICATE"),
        }
    }
}

/// Fields every timeline event carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Block timestamp
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,

    /// Chain position
    pub position: ChainPosition,

    /// Transaction hash
    pub tx_hash: TxHash,
}

/// Classified outcome event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineEvent {
    /// Validator registered
    Success(EventRecord),

    /// Registration rejected
    Failure {
        /// Event fields
        record: EventRecord,
        /// Inferred cause
        reason: FailureReason,
    },

    /// Stake withdrawn after exit
    Unstake(EventRecord),
}

impl TimelineEvent {
    /// Shared event fields
    pub fn record(&self) -> &EventRecord {
        match self {
            TimelineEvent::Success(record) => record,
            TimelineEvent::Failure { record, .. } => record,
            TimelineEvent::Unstake(record) => record,
        }
    }

    /// Block timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.record().timestamp
    }

    /// Chain position
    pub fn position(&self) -> ChainPosition {
        self.record().position
    }

    /// Transaction hash
    pub fn tx_hash(&self) -> &TxHash {
        &self.record().tx_hash
    }

    /// Whether this is an unstake
    pub fn is_unstake(&self) -> bool {
        matches!(self, TimelineEvent::Unstake(_))
    }

    /// Short label, used for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            TimelineEvent::Success(_) => "success",
            TimelineEvent::Failure { .. } => "failure",
            TimelineEvent::Unstake(_) => "unstake",
        }
    }
}

/// Resolved status of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StakeStatus {
    /// No qualifying outcome yet
    Pending,
    /// Registered and still staked
    Success,
    /// Registration failed
    Failed,
    /// Registered, then withdrawn
    Unstaked,
}

impl StakeStatus {
    /// Whether funds are currently (or about to be) staked
    pub fn is_active(&self) -> bool {
        matches!(self, StakeStatus::Pending | StakeStatus::Success)
    }

    /// Lowercase label, used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            StakeStatus::Pending => "pending",
            StakeStatus::Success => "success",
            StakeStatus::Failed => "failed",
            StakeStatus::Unstaked => "unstaked",
        }
    }
}

/// Outcome attached to an attempt after matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOutcome {
    /// Resolved status
    pub status: StakeStatus,

    /// Registration transaction, if the attempt succeeded
    pub deposit_tx: Option<TxHash>,

    /// Failure transaction, if the attempt failed
    pub failed_tx: Option<TxHash>,

    /// Withdrawal transaction, if the stake was withdrawn
    pub unstake_tx: Option<TxHash>,

    /// Inferred failure cause
    pub failure_reason: Option<FailureReason>,
}

impl ResolvedOutcome {
    /// No outcome found
    pub fn pending() -> Self {
        Self {
            status: StakeStatus::Pending,
            deposit_tx: None,
            failed_tx: None,
            unstake_tx: None,
            failure_reason: None,
        }
    }

    /// Registered by `deposit_tx`
    pub fn succeeded(deposit_tx: TxHash) -> Self {
        Self {
            status: StakeStatus::Success,
            deposit_tx: Some(deposit_tx),
            ..Self::pending()
        }
    }

    /// Rejected by `failed_tx`
    pub fn failed(failed_tx: TxHash, reason: FailureReason) -> Self {
        Self {
            status: StakeStatus::Failed,
            failed_tx: Some(failed_tx),
            failure_reason: Some(reason),
            ..Self::pending()
        }
    }

    /// Attach a withdrawal to a successful outcome
    ///
    /// Ignored unless the outcome is `Success`: a failed attempt never owns
    /// an unstake.
    pub fn with_unstake(mut self, unstake_tx: TxHash) -> Self {
        if self.status == StakeStatus::Success {
            self.status = StakeStatus::Unstaked;
            self.unstake_tx = Some(unstake_tx);
        }
        self
    }

    /// Check the field/status invariant
    pub fn is_consistent(&self) -> bool {
        let deposit = self.deposit_tx.is_some();
        let failed = self.failed_tx.is_some();
        let unstake = self.unstake_tx.is_some();
        let reason = self.failure_reason.is_some();

        match self.status {
            StakeStatus::Pending => !deposit && !failed && !unstake && !reason,
            StakeStatus::Success => deposit && !failed && !unstake && !reason,
            StakeStatus::Unstaked => deposit && !failed && unstake && !reason,
            StakeStatus::Failed => !deposit && failed && !unstake && reason,
        }
    }
}

impl Default for ResolvedOutcome {
    fn default() -> Self {
        Self::pending()
    }
}

/// Attempt copy annotated with its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAttempt<P> {
    /// The attempt as supplied
    #[serde(flatten)]
    pub attempt: StakeAttempt<P>,

    /// What it resolved to
    #[serde(flatten)]
    pub outcome: ResolvedOutcome,
}

impl<P> ResolvedAttempt<P> {
    /// Resolved status
    pub fn status(&self) -> StakeStatus {
        self.outcome.status
    }

    /// Drop the annotation
    pub fn into_attempt(self) -> StakeAttempt<P> {
        self.attempt
    }
}
