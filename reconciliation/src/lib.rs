//! Stake Reconciliation
//!
//! Resolves stake attempts against on-chain registration outcomes.
//!
//! # Pipeline
//!
//! 1. **Timeline**: read successes, failures and unstakes for the attempts'
//!    identity pairs and classify failures as `DUPLICATE` or `INVALID_KEY`
//! 2. **Matching**: assign events to attempts oldest first, each event at
//!    most once
//! 3. **Views**: active stakes, position summaries, provider roster
//!
//! # Example
//!
//! ```no_run
//! use reconciliation::{Config, ReconciliationEngine};
//! use stake_core::StakeAttempt;
//!
//! #[tokio::main]
//! async fn main() -> reconciliation::Result<()> {
//!     let engine = ReconciliationEngine::new(Config::default())?;
//!
//!     let attempts: Vec<StakeAttempt<()>> = Vec::new();
//!     let resolved = engine.reconcile(&attempts).await?;
//!     println!("Resolved {} attempts", resolved.len());
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod metrics;
pub mod positions;
pub mod snapshot;
pub mod timeline;

// Re-exports
pub use cache::{CacheStats, ProviderMetadata, ProviderMetadataCache};
pub use config::{Config, ProviderCacheConfig};
pub use engine::ReconciliationEngine;
pub use error::{Error, Result};
pub use filter::filter_active;
pub use matcher::match_stakes;
pub use metrics::Metrics;
pub use positions::{
    network_totals, provider_roster, summarize, NetworkTotals, PositionSummary, ProviderPosition,
    StakeAmount,
};
pub use snapshot::{ProviderEntry, Snapshot, StakePayload};
pub use timeline::{Timeline, TimelineBuilder};
