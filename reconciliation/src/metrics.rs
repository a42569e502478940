//! Metrics collection for observability
//!
//! Prometheus metrics for reconciliation runs. Each engine owns its registry;
//! nothing is registered globally.
//!
//! # Metrics
//!
//! - `reconciliation_runs_total` - Completed reconciliation runs
//! - `reconciliation_attempts_total{status}` - Resolved attempts by status
//! - `reconciliation_timeline_events_total{kind}` - Classified events by kind
//! - `reconciliation_duration_seconds` - Histogram of run latencies

use crate::timeline::Timeline;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use stake_core::StakeStatus;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Completed runs
    pub runs_total: IntCounter,

    /// Resolved attempts by status
    pub attempts_total: IntCounterVec,

    /// Classified timeline events by kind
    pub timeline_events_total: IntCounterVec,

    /// Run duration histogram
    pub duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("runs_total", &self.runs_total.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let runs_total = IntCounter::new(
            "reconciliation_runs_total",
            "Completed reconciliation runs",
        )?;
        registry.register(Box::new(runs_total.clone()))?;

        let attempts_total = IntCounterVec::new(
            Opts::new("reconciliation_attempts_total", "Resolved attempts by status"),
            &["status"],
        )?;
        registry.register(Box::new(attempts_total.clone()))?;

        let timeline_events_total = IntCounterVec::new(
            Opts::new(
                "reconciliation_timeline_events_total",
                "Classified timeline events by kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(timeline_events_total.clone()))?;

        let duration = Histogram::with_opts(
            HistogramOpts::new(
                "reconciliation_duration_seconds",
                "Histogram of reconciliation run latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            runs_total,
            attempts_total,
            timeline_events_total,
            duration,
            registry,
        })
    }

    /// Record classified events of a freshly built timeline
    pub fn record_timeline(&self, timeline: &Timeline) {
        for event in timeline.iter_events() {
            self.timeline_events_total
                .with_label_values(&[event.label()])
                .inc();
        }
    }

    /// Record a finished run
    pub fn record_run<I>(&self, statuses: I, duration_seconds: f64)
    where
        I: IntoIterator<Item = StakeStatus>,
    {
        self.runs_total.inc();
        for status in statuses {
            self.attempts_total.with_label_values(&[status.label()]).inc();
        }
        self.duration.observe(duration_seconds);
    }

    /// Resolved attempts recorded with `status`
    pub fn attempts_with_status(&self, status: StakeStatus) -> u64 {
        self.attempts_total.with_label_values(&[status.label()]).get()
    }

    /// Render the registry in the text exposition format
    pub fn gather_text(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Get registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
