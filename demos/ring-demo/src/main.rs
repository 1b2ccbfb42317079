//! Drives a ring end to end against the in-memory host store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use ringstore::config::RingConfig;
use ringstore::primitives::{ColumnValueMapper, ColumnValues};
use ringstore::registry::RingRegistry;
use ringstore::store::{MemoryStore, RecordStore};
use ringstore::telemetry::TracingObserver;
use serde_json::{Value, json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TARGET: &str = "events";

#[derive(Parser)]
#[command(name = "ring-demo")]
#[command(about = "Bounded, append-only ring collections over an in-memory store", long_about = None)]
struct Cli {
    /// Maximum rows the ring retains.
    #[arg(short, long, default_value_t = 3)]
    capacity: u64,

    /// Creates issued once the ring is installed.
    #[arg(short, long, default_value_t = 5)]
    inserts: u64,

    /// Rows written before the ring is installed.
    #[arg(short, long, default_value_t = 0)]
    prefill: u64,

    /// JSON file with registration settings.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn object(value: Value) -> ColumnValues {
    match value {
        Value::Object(map) => map,
        _ => ColumnValues::new(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    ensure!(cli.capacity > 0, "capacity must be a positive integer");

    let config = match &cli.config {
        Some(path) => RingConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RingConfig::default(),
    }
    .with_env_overrides();
    config.validate()?;

    let store = Arc::new(MemoryStore::new());
    store.create_collection(config.config_collection()).await?;
    store.create_collection(TARGET).await?;

    for n in 0..cli.prefill {
        store
            .create(TARGET, object(json!({"seq": n, "phase": "prefill"})))
            .await?;
    }

    let mut spec = ColumnValues::new();
    spec.insert(config.target_field().to_owned(), json!(TARGET));
    spec.insert(config.capacity_field().to_owned(), json!(cli.capacity));
    store.create(config.config_collection(), spec).await?;

    let registry = RingRegistry::start(
        Arc::clone(&store) as Arc<dyn RecordStore>,
        config,
        Arc::new(TracingObserver),
    )
    .await?;
    info!(rings = ?registry.active_rings().await, "registry ready");

    for n in 0..cli.inserts {
        let outcome = store
            .create(TARGET, object(json!({"seq": n, "phase": "live"})))
            .await?;
        info!(
            seq = n,
            row_id = %outcome.record().row_id(),
            overwrite = !outcome.is_insert(),
            "create applied"
        );
    }

    if let Some(first) = store.records(TARGET).await?.first() {
        match store
            .update(TARGET, first.row_id(), object(json!({"phase": "tampered"})))
            .await
        {
            Ok(_) => warn!("direct update unexpectedly succeeded"),
            Err(err) => info!(%err, "direct update refused"),
        }
    }

    if let Some(snapshot) = registry.snapshot(TARGET).await {
        println!("{}", serde_json::to_string(&snapshot)?);
    }
    for record in store.records(TARGET).await? {
        println!(
            "{}\t{}",
            record.row_id(),
            serde_json::to_string(record.column_values())?
        );
    }

    registry.shutdown().await;
    Ok(())
}
