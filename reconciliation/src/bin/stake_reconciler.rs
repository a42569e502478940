//! Offline reconciliation of a JSON snapshot
//!
//! Usage: `stake-reconciler <snapshot.json> [config.toml]`

use anyhow::Context;
use event_store::EventStoreHandle;
use reconciliation::{
    network_totals, provider_roster, summarize, Config, ProviderMetadataCache,
    ReconciliationEngine, Snapshot,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let snapshot_path = args
        .next()
        .context("usage: stake-reconciler <snapshot.json> [config.toml]")?;

    // Load configuration
    let config = match args.next() {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => Config::from_env()?,
    };

    // Initialize tracing; stdout carries the report
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting {} v{}", config.service_name, config.service_version);

    let snapshot = Snapshot::from_file(&snapshot_path)
        .with_context(|| format!("failed to load snapshot from {}", snapshot_path))?;

    // Seed the configured store
    let store = EventStoreHandle::open(&config.store)?;
    snapshot.seed(&store).await?;

    let cache = ProviderMetadataCache::from_config(&config.provider_cache);
    cache.init(snapshot.provider_metadata());

    let engine = ReconciliationEngine::with_store(Arc::new(store), config)?;
    let resolved = engine.reconcile(&snapshot.attempts).await?;

    let summary = summarize(&resolved);
    let mut roster = provider_roster(&resolved, &snapshot.registered_keys);
    cache.annotate(&mut roster);
    let totals = network_totals(&resolved);

    let report = serde_json::json!({
        "resolved": resolved,
        "summary": summary,
        "providers": roster,
        "network": totals,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    tracing::info!(
        attempts = resolved.len(),
        pending = summary.pending,
        staked = summary.staked,
        "Reconciliation report written"
    );

    Ok(())
}
