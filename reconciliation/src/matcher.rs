//! Stake matcher
//!
//! Assigns timeline events to stake attempts, first come first served.
//!
//! # Rules
//!
//! - All attempts are ordered together by `(block_number, log_index)`,
//!   whatever their kind. Matching kinds in separate passes lets a later
//!   delegation steal the outcome of an earlier direct stake.
//! - An attempt takes the first unconsumed success/failure of its pair whose
//!   timestamp is not before its own.
//! - A success then takes the first unconsumed unstake not before it.
//! - A failure is terminal.
//! - Each event is consumed at most once per call.

use crate::timeline::Timeline;
use stake_core::{
    ChainPosition, IdentityPair, ResolvedAttempt, ResolvedOutcome, StakeAttempt, TimelineEvent,
};
use std::collections::HashSet;

/// Events already assigned during one matching call
#[derive(Debug, Default)]
struct ConsumptionLedger {
    consumed: HashSet<(IdentityPair, ChainPosition)>,
}

impl ConsumptionLedger {
    fn is_consumed(&self, pair: &IdentityPair, position: ChainPosition) -> bool {
        self.consumed.contains(&(pair.clone(), position))
    }

    fn consume(&mut self, pair: &IdentityPair, position: ChainPosition) {
        self.consumed.insert((pair.clone(), position));
    }
}

/// Resolve every attempt against `timeline`
///
/// Results come back in the order of `attempts`.
pub fn match_stakes<P: Clone>(
    attempts: &[StakeAttempt<P>],
    timeline: &Timeline,
) -> Vec<ResolvedAttempt<P>> {
    let mut order: Vec<usize> = (0..attempts.len()).collect();
    order.sort_by_key(|&index| attempts[index].position());

    let mut ledger = ConsumptionLedger::default();
    let mut outcomes = vec![ResolvedOutcome::pending(); attempts.len()];

    for index in order {
        outcomes[index] = resolve_attempt(&attempts[index], timeline, &mut ledger);
    }

    tracing::debug!(
        attempts = attempts.len(),
        consumed = ledger.consumed.len(),
        "Matched stake attempts"
    );

    attempts
        .iter()
        .cloned()
        .zip(outcomes)
        .map(|(attempt, outcome)| ResolvedAttempt { attempt, outcome })
        .collect()
}

fn resolve_attempt<P>(
    attempt: &StakeAttempt<P>,
    timeline: &Timeline,
    ledger: &mut ConsumptionLedger,
) -> ResolvedOutcome {
    let pair = attempt.pair();
    let events = timeline.events(&pair);

    let candidate = events.iter().find(|event| {
        !event.is_unstake()
            && event.timestamp() >= attempt.timestamp
            && !ledger.is_consumed(&pair, event.position())
    });

    let Some(event) = candidate else {
        tracing::trace!(pair = %pair, position = %attempt.position(), "No outcome yet");
        return ResolvedOutcome::pending();
    };

    ledger.consume(&pair, event.position());

    let outcome = match event {
        TimelineEvent::Success(record) => {
            let outcome = ResolvedOutcome::succeeded(record.tx_hash.clone());

            let unstake = events.iter().find(|later| {
                later.is_unstake()
                    && later.timestamp() >= record.timestamp
                    && !ledger.is_consumed(&pair, later.position())
            });

            match unstake {
                Some(unstake) => {
                    ledger.consume(&pair, unstake.position());
                    outcome.with_unstake(unstake.tx_hash().clone())
                }
                None => outcome,
            }
        }
        TimelineEvent::Failure { record, reason } => {
            ResolvedOutcome::failed(record.tx_hash.clone(), *reason)
        }
        // excluded by the search above
        TimelineEvent::Unstake(_) => ResolvedOutcome::pending(),
    };

    tracing::trace!(
        pair = %pair,
        position = %attempt.position(),
        status = outcome.status.label(),
        "Resolved stake attempt"
    );

    outcome
}
