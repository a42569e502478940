//! Active-stake filter

use crate::{matcher::match_stakes, timeline::Timeline};
use stake_core::{ResolvedAttempt, StakeAttempt};

/// Attempts whose funds are still staked (or may yet be)
///
/// Drops attempts that resolve to `Failed` or `Unstaked` and returns the
/// rest unannotated, in input order.
pub fn filter_active<P: Clone>(attempts: &[StakeAttempt<P>], timeline: &Timeline) -> Vec<StakeAttempt<P>> {
    match_stakes(attempts, timeline)
        .into_iter()
        .filter(|resolved| resolved.status().is_active())
        .map(ResolvedAttempt::into_attempt)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stake_core::{Address, EventRow, TxHash};

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{}", format!("{:02x}", n).repeat(20))).unwrap()
    }

    fn row(withdrawer: u8, block: u64, n: u64) -> EventRow {
        EventRow {
            attester: addr(1),
            withdrawer: addr(withdrawer),
            timestamp: Utc.timestamp_opt(1_700_000_000 + block as i64 * 12, 0).unwrap(),
            block_number: block,
            log_index: 0,
            tx_hash: TxHash::parse(&format!("0x{:064x}", n)).unwrap(),
        }
    }

    fn attempt(withdrawer: u8, block: u64, label: &'static str) -> StakeAttempt<&'static str> {
        StakeAttempt {
            attester: addr(1),
            withdrawer: addr(withdrawer),
            timestamp: Utc.timestamp_opt(1_700_000_000 + block as i64 * 12, 0).unwrap(),
            block_number: block,
            log_index: 0,
            kind: None,
            payload: label,
        }
    }

    #[test]
    fn test_keeps_pending_and_success_only() {
        // withdrawer 2: staked; 3: failed; 4: unstaked; 5: nothing yet
        let timeline = Timeline::from_rows(
            vec![row(2, 105, 1), row(4, 105, 3)],
            vec![row(3, 105, 2)],
            vec![row(4, 200, 4)],
        );
        let attempts = vec![
            attempt(2, 100, "staked"),
            attempt(3, 100, "failed"),
            attempt(4, 100, "unstaked"),
            attempt(5, 100, "pending"),
        ];

        let active = filter_active(&attempts, &timeline);
        let labels: Vec<&str> = active.iter().map(|a| a.payload).collect();
        assert_eq!(labels, vec!["staked", "pending"]);
        assert_eq!(active[0], attempts[0]);
    }

    #[test]
    fn test_empty_input() {
        let active = filter_active::<()>(&[], &Timeline::default());
        assert!(active.is_empty());
    }
}
