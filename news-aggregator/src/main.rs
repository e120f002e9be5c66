use anyhow::Context;
use clap::Parser;
use news_aggregator::{Cli, IngestionPipeline, PgSnapshotMirror, Scheduler, SharedCache, SnapshotMirror};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.to_config();
    let registry = cli.registry().context("failed to load source registry")?;
    info!("Starting news aggregator with {} sources", registry.len());

    let mirror: Option<Arc<dyn SnapshotMirror>> = match &cli.database_url {
        Some(url) => match PgSnapshotMirror::connect(url).await {
            Ok(mirror) => Some(Arc::new(mirror)),
            Err(e) => {
                warn!("Snapshot mirror disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let cache = SharedCache::new();
    let pipeline = IngestionPipeline::from_config(config.clone(), registry, cache.clone(), mirror)
        .context("failed to build ingestion pipeline")?;
    let scheduler = Scheduler::new(Arc::new(pipeline), config.interval());

    if cli.once {
        if let Some(report) = scheduler.run_once().await {
            info!(
                "Cycle {}: {} unique articles from {} sources ({} failed)",
                report.cycle_id, report.unique, report.sources_ok, report.sources_failed
            );
        }
        let snapshot = cache.snapshot().await;
        println!("{}", serde_json::to_string_pretty(&*snapshot)?);
        return Ok(());
    }

    scheduler.run_forever().await;
    Ok(())
}
