//! Property-based tests for matching invariants
//!
//! These tests use proptest to verify:
//! - Exclusivity: every event is claimed by at most one attempt
//! - Order independence: shuffling attempts or rows changes nothing
//! - No events, no outcome: every attempt stays pending
//! - FIFO: a younger attempt never resolves while an older one waits
//! - Consistency: status and outcome fields always agree

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use reconciliation::{filter_active, match_stakes, Timeline};
use stake_core::{
    Address, EventRow, IdentityPair, ResolvedAttempt, StakeAttempt, StakeStatus, TxHash,
};
use std::collections::{HashMap, HashSet};

fn addr(n: u8) -> Address {
    Address::parse(&format!("0x{}", format!("{:02x}", n).repeat(20))).unwrap()
}

fn tx(n: usize) -> TxHash {
    TxHash::parse(&format!("0x{:064x}", n)).unwrap()
}

fn at(block: u64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + block as i64 * 12, 0).unwrap()
}

/// Raw rows for one generated world
#[derive(Debug, Clone)]
struct Rows {
    successes: Vec<EventRow>,
    failures: Vec<EventRow>,
    unstakes: Vec<EventRow>,
}

impl Rows {
    fn timeline(&self) -> Timeline {
        Timeline::from_rows(
            self.successes.clone(),
            self.failures.clone(),
            self.unstakes.clone(),
        )
    }

    fn reversed(&self) -> Rows {
        let rev = |rows: &Vec<EventRow>| rows.iter().rev().cloned().collect();
        Rows {
            successes: rev(&self.successes),
            failures: rev(&self.failures),
            unstakes: rev(&self.unstakes),
        }
    }
}

/// Strategy for attempts over two identity pairs with distinct positions
///
/// The payload is the attempt's index, used to line results up again.
fn attempts_strategy() -> impl Strategy<Value = Vec<StakeAttempt<usize>>> {
    prop::collection::vec((2u8..4, 0u64..40), 0..12).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(index, (withdrawer, block))| StakeAttempt {
                attester: addr(1),
                withdrawer: addr(withdrawer),
                timestamp: at(block),
                block_number: block,
                log_index: index as u64,
                kind: None,
                payload: index,
            })
            .collect()
    })
}

/// Strategy for outcome rows with unique positions and tx hashes
fn rows_strategy() -> impl Strategy<Value = Rows> {
    prop::collection::vec((0u8..3, 2u8..4, 0u64..60), 0..16).prop_map(|specs| {
        let mut rows = Rows {
            successes: Vec::new(),
            failures: Vec::new(),
            unstakes: Vec::new(),
        };

        for (index, (kind, withdrawer, block)) in specs.into_iter().enumerate() {
            let row = EventRow {
                attester: addr(1),
                withdrawer: addr(withdrawer),
                timestamp: at(block),
                block_number: block,
                log_index: 100 + index as u64,
                tx_hash: tx(index + 1),
            };
            match kind {
                0 => rows.successes.push(row),
                1 => rows.failures.push(row),
                _ => rows.unstakes.push(row),
            }
        }

        rows
    })
}

fn by_payload(resolved: Vec<ResolvedAttempt<usize>>) -> HashMap<usize, ResolvedAttempt<usize>> {
    resolved
        .into_iter()
        .map(|entry| (entry.attempt.payload, entry))
        .collect()
}

proptest! {
    #[test]
    fn test_events_claimed_at_most_once(attempts in attempts_strategy(), rows in rows_strategy()) {
        let resolved = match_stakes(&attempts, &rows.timeline());

        let mut claimed: HashSet<(IdentityPair, TxHash)> = HashSet::new();
        for entry in &resolved {
            let outcome = &entry.outcome;
            for hash in [&outcome.deposit_tx, &outcome.failed_tx, &outcome.unstake_tx]
                .into_iter()
                .flatten()
            {
                prop_assert!(claimed.insert((entry.attempt.pair(), hash.clone())));
            }
        }
    }

    #[test]
    fn test_attempt_order_does_not_matter(
        (attempts, shuffled) in attempts_strategy()
            .prop_flat_map(|attempts| (Just(attempts.clone()), Just(attempts).prop_shuffle())),
        rows in rows_strategy(),
    ) {
        let timeline = rows.timeline();
        let original = by_payload(match_stakes(&attempts, &timeline));
        let permuted = by_payload(match_stakes(&shuffled, &timeline));
        prop_assert_eq!(original, permuted);
    }

    #[test]
    fn test_row_order_does_not_matter(attempts in attempts_strategy(), rows in rows_strategy()) {
        let timeline = rows.timeline();
        prop_assert_eq!(&timeline, &rows.reversed().timeline());
        prop_assert_eq!(
            match_stakes(&attempts, &timeline),
            match_stakes(&attempts, &rows.reversed().timeline())
        );
    }

    #[test]
    fn test_no_events_means_pending(attempts in attempts_strategy()) {
        let resolved = match_stakes(&attempts, &Timeline::default());
        prop_assert!(resolved.iter().all(|entry| entry.status() == StakeStatus::Pending));
        prop_assert_eq!(filter_active(&attempts, &Timeline::default()), attempts);
    }

    #[test]
    fn test_younger_attempt_never_overtakes(attempts in attempts_strategy(), rows in rows_strategy()) {
        let resolved = match_stakes(&attempts, &rows.timeline());

        for older in &resolved {
            if older.status() != StakeStatus::Pending {
                continue;
            }
            for younger in &resolved {
                if younger.attempt.pair() == older.attempt.pair()
                    && younger.attempt.position() > older.attempt.position()
                {
                    prop_assert_eq!(younger.status(), StakeStatus::Pending);
                }
            }
        }
    }

    #[test]
    fn test_outcomes_are_consistent(attempts in attempts_strategy(), rows in rows_strategy()) {
        let resolved = match_stakes(&attempts, &rows.timeline());

        prop_assert_eq!(resolved.len(), attempts.len());
        for (entry, attempt) in resolved.iter().zip(&attempts) {
            prop_assert_eq!(&entry.attempt, attempt);
            prop_assert!(entry.outcome.is_consistent());
        }
    }
}
