//! Event timeline builder
//!
//! Turns the three outcome collections for a set of identity pairs into one
//! chronological, classified event list per pair.
//!
//! # Algorithm
//!
//! 1. Deduplicate pairs
//! 2. Read successes, failures and unstakes concurrently (all or nothing)
//! 3. Merge and sort by `(block_number, log_index)`
//! 4. Drop rows already seen for the same `(pair, tx_hash)`
//! 5. Walk once, tracking whether each pair is currently staked:
//!    - success: staked from here on
//!    - unstake: no longer staked
//!    - failure: `DUPLICATE` if staked at that moment, else `INVALID_KEY`
//!
//! # Example
//!
//! ```text
//! block 105  success   -> Success              (pair now staked)
//! block 205  failure   -> Failure(DUPLICATE)
//! block 250  unstake   -> Unstake              (pair no longer staked)
//! block 305  failure   -> Failure(INVALID_KEY)
//! ```

use crate::Result;
use event_store::StakeEventStore;
use stake_core::{EventRow, FailureReason, IdentityPair, TimelineEvent, TxHash};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Source collection of a row; the order breaks same-position ties
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RowKind {
    Success,
    Failure,
    Unstake,
}

/// Classified events per identity pair, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    events: HashMap<IdentityPair, Vec<TimelineEvent>>,
}

impl Timeline {
    /// Classify raw rows
    ///
    /// Input order does not matter: rows are sorted before the walk, and
    /// rows sharing a position are ordered by collection then tx hash.
    pub fn from_rows(
        successes: Vec<EventRow>,
        failures: Vec<EventRow>,
        unstakes: Vec<EventRow>,
    ) -> Self {
        let mut rows: Vec<(RowKind, EventRow)> = successes
            .into_iter()
            .map(|row| (RowKind::Success, row))
            .chain(failures.into_iter().map(|row| (RowKind::Failure, row)))
            .chain(unstakes.into_iter().map(|row| (RowKind::Unstake, row)))
            .collect();

        rows.sort_by(|(kind_a, a), (kind_b, b)| {
            a.position()
                .cmp(&b.position())
                .then(kind_a.cmp(kind_b))
                .then_with(|| a.tx_hash.cmp(&b.tx_hash))
        });

        let mut staked: HashMap<IdentityPair, bool> = HashMap::new();
        let mut seen: HashSet<(IdentityPair, TxHash)> = HashSet::new();
        let mut events: HashMap<IdentityPair, Vec<TimelineEvent>> = HashMap::new();

        for (kind, row) in rows {
            let pair = row.pair();

            if !seen.insert((pair.clone(), row.tx_hash.clone())) {
                tracing::trace!(pair = %pair, tx = %row.tx_hash, "Skipping duplicate row");
                continue;
            }

            let record = row.record();
            let event = match kind {
                RowKind::Success => {
                    staked.insert(pair.clone(), true);
                    TimelineEvent::Success(record)
                }
                RowKind::Unstake => {
                    staked.insert(pair.clone(), false);
                    TimelineEvent::Unstake(record)
                }
                RowKind::Failure => {
                    let reason = if staked.get(&pair).copied().unwrap_or(false) {
                        FailureReason::Duplicate
                    } else {
                        FailureReason::InvalidKey
                    };
                    tracing::trace!(
                        pair = %pair,
                        tx = %record.tx_hash,
                        reason = %reason,
                        "Classified registration failure"
                    );
                    TimelineEvent::Failure { record, reason }
                }
            };

            events.entry(pair).or_default().push(event);
        }

        Self { events }
    }

    /// Events for `pair`, oldest first (empty if none)
    pub fn events(&self, pair: &IdentityPair) -> &[TimelineEvent] {
        self.events.get(pair).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pairs with at least one event
    pub fn pairs(&self) -> impl Iterator<Item = &IdentityPair> {
        self.events.keys()
    }

    /// Number of pairs with at least one event
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no pair has any event
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total number of events across pairs
    pub fn event_count(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    /// Iterate over every event of every pair
    pub fn iter_events(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.events.values().flatten()
    }

    /// Whether the last success/unstake for `pair` was a success
    pub fn is_active(&self, pair: &IdentityPair) -> bool {
        self.events(pair)
            .iter()
            .rev()
            .find_map(|event| match event {
                TimelineEvent::Success(_) => Some(true),
                TimelineEvent::Unstake(_) => Some(false),
                TimelineEvent::Failure { .. } => None,
            })
            .unwrap_or(false)
    }
}

/// Builds timelines from a store
#[derive(Clone)]
pub struct TimelineBuilder {
    store: Arc<dyn StakeEventStore>,
}

impl std::fmt::Debug for TimelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineBuilder").finish_non_exhaustive()
    }
}

impl TimelineBuilder {
    /// Create new builder
    pub fn new(store: Arc<dyn StakeEventStore>) -> Self {
        Self { store }
    }

    /// Build the timeline for `pairs`
    ///
    /// Duplicate pairs are fine. Any failed read fails the whole build.
    pub async fn build_timeline(&self, pairs: &[IdentityPair]) -> Result<Timeline> {
        let unique: Vec<IdentityPair> = pairs
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if unique.is_empty() {
            return Ok(Timeline::default());
        }

        let (successes, failures, unstakes) = tokio::try_join!(
            self.store.successful_registrations(&unique),
            self.store.failed_registrations(&unique),
            self.store.unstake_finalizations(&unique),
        )?;

        tracing::debug!(
            pairs = unique.len(),
            successes = successes.len(),
            failures = failures.len(),
            unstakes = unstakes.len(),
            "Fetched outcome rows"
        );

        Ok(Timeline::from_rows(successes, failures, unstakes))
    }
}
