//! Reconciliation engine
//!
//! Ties the event store, the timeline builder and metrics together.

use crate::{
    config::Config, filter::filter_active, matcher::match_stakes, metrics::Metrics,
    timeline::{Timeline, TimelineBuilder},
    Result,
};
use event_store::{EventStoreHandle, StakeEventStore};
use stake_core::{IdentityPair, ResolvedAttempt, StakeAttempt};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Reconciliation engine
pub struct ReconciliationEngine {
    /// Timeline builder over the configured store
    builder: TimelineBuilder,

    /// Metrics collector
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReconciliationEngine {
    /// Create engine over the backend named in `config`
    pub fn new(config: Config) -> Result<Self> {
        let store = EventStoreHandle::open(&config.store)?;
        Self::with_store(Arc::new(store), config)
    }

    /// Create engine over an existing store
    pub fn with_store(store: Arc<dyn StakeEventStore>, config: Config) -> Result<Self> {
        let metrics = Metrics::new()?;

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            backend = ?config.store.backend,
            "Reconciliation engine ready"
        );

        Ok(Self {
            builder: TimelineBuilder::new(store),
            metrics,
            config,
        })
    }

    /// Build the classified timeline for `pairs`
    pub async fn build_timeline(&self, pairs: &[IdentityPair]) -> Result<Timeline> {
        let timeline = self.builder.build_timeline(pairs).await?;
        self.metrics.record_timeline(&timeline);
        Ok(timeline)
    }

    /// Resolve every attempt against the store's current events
    ///
    /// Results come back in input order. A failed store read fails the run
    /// and nothing is recorded.
    pub async fn reconcile<P: Clone>(
        &self,
        attempts: &[StakeAttempt<P>],
    ) -> Result<Vec<ResolvedAttempt<P>>> {
        let run_id = Uuid::now_v7();
        let span = tracing::info_span!("reconcile", run_id = %run_id);

        async {
            let started = Instant::now();
            let pairs: Vec<IdentityPair> = attempts.iter().map(StakeAttempt::pair).collect();

            let timeline = self.build_timeline(&pairs).await?;
            let resolved = match_stakes(attempts, &timeline);

            let elapsed = started.elapsed().as_secs_f64();
            self.metrics
                .record_run(resolved.iter().map(ResolvedAttempt::status), elapsed);

            tracing::info!(
                attempts = attempts.len(),
                pairs = timeline.len(),
                events = timeline.event_count(),
                elapsed_ms = elapsed * 1000.0,
                "Reconciliation complete"
            );

            Ok::<_, crate::Error>(resolved)
        }
        .instrument(span)
        .await
    }

    /// Attempts still staked or awaiting an outcome, in input order
    pub async fn active_stakes<P: Clone>(
        &self,
        attempts: &[StakeAttempt<P>],
    ) -> Result<Vec<StakeAttempt<P>>> {
        let pairs: Vec<IdentityPair> = attempts.iter().map(StakeAttempt::pair).collect();
        let timeline = self.build_timeline(&pairs).await?;
        Ok(filter_active(attempts, &timeline))
    }

    /// Get metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
