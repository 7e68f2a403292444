//! Yangbridge Daemon - Main entry point
//!
//! Two modes: `sync` runs the bulk catalog-to-broker pipeline once and
//! exits; `serve` runs the platform registry API.

mod api;
mod config;
mod pipeline;
mod registry;
mod state;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use yangbridge_client::{ContextBrokerClient, YangCatalogClient};
use yangbridge_core::RelationshipPolicy;

use crate::pipeline::SyncPipeline;

#[derive(Parser, Debug)]
#[command(name = "yangbridge")]
#[command(about = "YANG module catalog and platform metadata bridge to NGSI-LD")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "yangbridge.toml")]
    config: PathBuf,

    /// NGSI-LD context broker URI (overrides config)
    #[arg(long)]
    broker_uri: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synchronize the full YANG catalog into the broker
    Sync {
        /// Read the catalog snapshot from a local file instead of the
        /// catalog service
        #[arg(long)]
        local_catalog: Option<PathBuf>,

        /// Emit two-sided dependency graph edges
        #[arg(long)]
        bidirectional: bool,
    },
    /// Run the platform registry API server
    Serve {
        /// Bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Yangbridge v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = config::load_config(&args.config)?;
    if let Some(broker_uri) = args.broker_uri {
        config.broker.uri = broker_uri;
    }

    match args.command {
        Command::Sync {
            local_catalog,
            bidirectional,
        } => {
            if bidirectional {
                config.sync.relationship_policy = RelationshipPolicy::Bidirectional;
            }
            run_sync(&config, local_catalog.as_deref()).await
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.registry.bind.clone());
            let state = Arc::new(state::AppState::new(config)?);
            api::run(state, &bind).await
        }
    }
}

async fn run_sync(config: &config::Config, local_catalog: Option<&std::path::Path>) -> Result<()> {
    let catalog = match local_catalog {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog snapshot from file");
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse catalog file {}", path.display()))?
        }
        None => {
            let client = YangCatalogClient::new(&config.catalog.uri)
                .context("Failed to create catalog client")?;
            client
                .fetch_full_catalog()
                .await
                .context("Failed to fetch catalog snapshot")?
        }
    };

    let broker = ContextBrokerClient::new(&config.broker.uri, &config.broker.context_uri)
        .context("Failed to create context broker client")?;
    let pipeline = SyncPipeline::new(
        broker,
        config.sync.batch_size,
        config.sync.relationship_policy,
    );
    let report = pipeline.run(&catalog).await?;

    info!(
        modules = report.total_modules,
        batches = report.batches_submitted,
        failed = report.batches_failed,
        entities = report.entities_submitted,
        "Synchronization with YANG catalog completed"
    );
    if report.batches_failed > 0 {
        tracing::warn!(
            failed = report.batches_failed,
            "Some batches were skipped; re-run after the snapshot is repaired"
        );
    }
    Ok(())
}
