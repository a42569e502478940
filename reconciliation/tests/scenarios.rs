//! End-to-end reconciliation scenarios
//!
//! Each scenario seeds an event store, runs the engine and checks the
//! resolved outcomes.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use event_store::{
    InMemoryEventStore, RawUnstakeRow, RocksEventStore, StakeEventSink, StakeEventStore,
    StoreBackend, StoreConfig, VaultPosition,
};
use reconciliation::{
    provider_roster, summarize, Config, Error, ReconciliationEngine, StakePayload,
};
use stake_core::{
    Address, AttemptKind, EventRow, FailureReason, IdentityPair, StakeAttempt, StakeStatus,
    TokenAmount, TxHash,
};
use std::collections::HashMap;
use std::sync::Arc;

fn addr(n: u8) -> Address {
    Address::parse(&format!("0x{}", format!("{:02x}", n).repeat(20))).unwrap()
}

fn tx(n: u64) -> TxHash {
    TxHash::parse(&format!("0x{:064x}", n)).unwrap()
}

fn at(block: u64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + block as i64 * 12, 0).unwrap()
}

const ATTESTER: u8 = 0x11;
const WITHDRAWER: u8 = 0x22;
const VAULT: u8 = 0x33;
const PROVIDER: u8 = 0x99;

fn row(block: u64, log: u64, n: u64) -> EventRow {
    EventRow {
        attester: addr(ATTESTER),
        withdrawer: addr(WITHDRAWER),
        timestamp: at(block),
        block_number: block,
        log_index: log,
        tx_hash: tx(n),
    }
}

fn attempt(block: u64, kind: AttemptKind) -> StakeAttempt<StakePayload> {
    StakeAttempt {
        attester: addr(ATTESTER),
        withdrawer: addr(WITHDRAWER),
        timestamp: at(block),
        block_number: block,
        log_index: 0,
        kind: Some(kind),
        payload: StakePayload {
            amount: TokenAmount::from(32u64),
            provider: (kind == AttemptKind::Delegation).then(|| addr(PROVIDER)),
        },
    }
}

fn engine(store: InMemoryEventStore) -> ReconciliationEngine {
    ReconciliationEngine::with_store(Arc::new(store), Config::default()).unwrap()
}

#[tokio::test]
async fn test_simple_success() {
    let store = InMemoryEventStore::new();
    store.record_registration(row(105, 1, 1)).await.unwrap();

    let resolved = engine(store)
        .reconcile(&[attempt(100, AttemptKind::Direct)])
        .await
        .unwrap();

    assert_eq!(resolved[0].status(), StakeStatus::Success);
    assert_eq!(resolved[0].outcome.deposit_tx, Some(tx(1)));
}

#[tokio::test]
async fn test_invalid_key() {
    let store = InMemoryEventStore::new();
    store.record_registration_failure(row(105, 0, 1)).await.unwrap();

    let resolved = engine(store)
        .reconcile(&[attempt(100, AttemptKind::Direct)])
        .await
        .unwrap();

    assert_eq!(resolved[0].status(), StakeStatus::Failed);
    assert_eq!(resolved[0].outcome.failure_reason, Some(FailureReason::InvalidKey));
}

#[tokio::test]
async fn test_duplicate() {
    let store = InMemoryEventStore::new();
    store.record_registration(row(105, 0, 1)).await.unwrap();
    store.record_registration_failure(row(205, 0, 2)).await.unwrap();

    let resolved = engine(store)
        .reconcile(&[attempt(100, AttemptKind::Direct), attempt(200, AttemptKind::Direct)])
        .await
        .unwrap();

    assert_eq!(resolved[0].status(), StakeStatus::Success);
    assert_eq!(resolved[1].status(), StakeStatus::Failed);
    assert_eq!(resolved[1].outcome.failure_reason, Some(FailureReason::Duplicate));
    assert_eq!(resolved[1].outcome.failed_tx, Some(tx(2)));
}

#[tokio::test]
async fn test_reset_via_unstake() {
    let store = InMemoryEventStore::new();
    store.record_registration(row(105, 0, 1)).await.unwrap();
    store
        .record_unstake(RawUnstakeRow {
            attester: addr(ATTESTER),
            recipient: addr(WITHDRAWER),
            timestamp: at(200),
            block_number: 200,
            log_index: 0,
            tx_hash: tx(2),
        })
        .await
        .unwrap();
    store.record_registration_failure(row(305, 0, 3)).await.unwrap();

    let resolved = engine(store)
        .reconcile(&[attempt(100, AttemptKind::Direct), attempt(300, AttemptKind::Direct)])
        .await
        .unwrap();

    assert_eq!(resolved[0].status(), StakeStatus::Unstaked);
    assert_eq!(resolved[0].outcome.unstake_tx, Some(tx(2)));
    assert_eq!(resolved[1].status(), StakeStatus::Failed);
    assert_eq!(resolved[1].outcome.failure_reason, Some(FailureReason::InvalidKey));
}

#[tokio::test]
async fn test_cross_kind_fifo() {
    let store = InMemoryEventStore::new();
    store.record_registration_failure(row(200, 0, 1)).await.unwrap();

    let engine = engine(store);
    let attempts = [
        attempt(150, AttemptKind::Delegation),
        attempt(100, AttemptKind::Direct),
    ];
    let resolved = engine.reconcile(&attempts).await.unwrap();

    assert_eq!(resolved[0].status(), StakeStatus::Pending);
    assert_eq!(resolved[1].status(), StakeStatus::Failed);

    let active = engine.active_stakes(&attempts).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].kind, Some(AttemptKind::Delegation));
}

#[tokio::test]
async fn test_vault_unstake_resolves_delegation() {
    let store = InMemoryEventStore::new();
    store.record_registration(row(105, 0, 1)).await.unwrap();
    store
        .record_vault_position(VaultPosition {
            vault: addr(VAULT),
            owner: addr(WITHDRAWER),
        })
        .await
        .unwrap();
    store
        .record_unstake(RawUnstakeRow {
            attester: addr(ATTESTER),
            recipient: addr(VAULT),
            timestamp: at(200),
            block_number: 200,
            log_index: 3,
            tx_hash: tx(2),
        })
        .await
        .unwrap();

    let engine = engine(store);
    let attempts = [attempt(100, AttemptKind::Delegation)];
    let resolved = engine.reconcile(&attempts).await.unwrap();

    assert_eq!(resolved[0].status(), StakeStatus::Unstaked);
    assert_eq!(resolved[0].outcome.unstake_tx, Some(tx(2)));
    assert!(engine.active_stakes(&attempts).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_positions_from_engine_run() {
    let store = InMemoryEventStore::new();
    store.record_registration(row(105, 0, 1)).await.unwrap();

    let resolved = engine(store)
        .reconcile(&[
            attempt(100, AttemptKind::Delegation),
            attempt(200, AttemptKind::Delegation),
            attempt(300, AttemptKind::Direct),
        ])
        .await
        .unwrap();

    let summary = summarize(&resolved);
    assert_eq!(summary.staked, 1);
    assert_eq!(summary.pending, 2);
    assert_eq!(summary.active_amount, TokenAmount::from(96u64));

    let roster = provider_roster(&resolved, &HashMap::from([(addr(PROVIDER), 1u64)]));
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].active_delegations, 2);
    assert_eq!(roster[0].available_keys, 0);
}

#[tokio::test]
async fn test_rocksdb_backend_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store_config = StoreConfig {
        backend: StoreBackend::RocksDb,
        data_dir: dir.path().join("events"),
        ..Default::default()
    };

    let store = RocksEventStore::open(&store_config).unwrap();
    store.record_registration(row(105, 0, 1)).await.unwrap();
    store.record_registration_failure(row(205, 0, 2)).await.unwrap();

    let engine = ReconciliationEngine::with_store(Arc::new(store), Config::default()).unwrap();
    let resolved = engine
        .reconcile(&[attempt(100, AttemptKind::Direct), attempt(200, AttemptKind::Direct)])
        .await
        .unwrap();

    assert_eq!(resolved[0].status(), StakeStatus::Success);
    assert_eq!(resolved[1].outcome.failure_reason, Some(FailureReason::Duplicate));
}

struct UnavailableStore;

#[async_trait]
impl StakeEventStore for UnavailableStore {
    async fn successful_registrations(
        &self,
        _pairs: &[IdentityPair],
    ) -> event_store::Result<Vec<EventRow>> {
        Err(event_store::Error::Storage("registrations unavailable".to_string()))
    }

    async fn failed_registrations(
        &self,
        _pairs: &[IdentityPair],
    ) -> event_store::Result<Vec<EventRow>> {
        Ok(vec![])
    }

    async fn unstake_finalizations(
        &self,
        _pairs: &[IdentityPair],
    ) -> event_store::Result<Vec<EventRow>> {
        Ok(vec![])
    }
}

#[tokio::test]
async fn test_read_failure_fails_the_run() {
    let engine =
        ReconciliationEngine::with_store(Arc::new(UnavailableStore), Config::default()).unwrap();

    let result = engine.reconcile(&[attempt(100, AttemptKind::Direct)]).await;
    assert!(matches!(result, Err(Error::Store(event_store::Error::Storage(_)))));
    assert_eq!(engine.metrics().runs_total.get(), 0);
}
