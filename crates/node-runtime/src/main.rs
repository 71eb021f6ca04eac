//! # Indexer Node Runtime
//!
//! The entry point of the block indexer.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`RUST_LOG`, default `info`)
//! 2. Load configuration from `IDX_*` environment variables
//! 3. Open storage and build the subsystems (validator index rebuilt)
//! 4. Wire and start the pipeline, resuming after the last committed height
//! 5. Map Ctrl-C to the stopper
//! 6. Wait for the source to drain, a halt, or a stop signal

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::{
    spawn_signal_listener, IndexerConfig, IndexerPipeline, JsonLinesSource, StorageBackend,
    SubsystemContainer,
};

/// Load configuration from the environment.
fn load_config() -> Result<IndexerConfig> {
    let config = IndexerConfig::from_env().context("invalid IDX_* configuration")?;
    info!(
        indexer = %config.indexer_name,
        denom = %config.fee_denom,
        max_retries = config.max_retries,
        "Configuration loaded"
    );
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("===========================================");
    info!("  Blob-Chain Indexer v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = load_config()?;
    let input = config
        .input
        .clone()
        .context("IDX_INPUT must name a JSON lines file of block envelopes")?;

    let store = StorageBackend::open(&config).context("failed to open storage")?;
    let container =
        SubsystemContainer::new(config, store).context("failed to initialize subsystems")?;

    let source = JsonLinesSource::open(&input)
        .await
        .with_context(|| format!("failed to open block source {}", input.display()))?;

    let mut pipeline = IndexerPipeline::build(&container, source);
    let signal = pipeline.signal();
    pipeline.start()?;
    info!("Indexer is running. Press Ctrl+C to stop.");

    let listener = spawn_signal_listener(signal, pipeline.subscribe());
    let result = pipeline.wait().await;
    listener.await.context("signal listener failed")?;
    result.context("ingestion stopped")?;

    let last_height = container.coordinator.lock().await.last_height()?;
    info!(last_height = ?last_height, "Shutdown complete");
    Ok(())
}
