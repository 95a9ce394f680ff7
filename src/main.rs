//! exchange-router command line.
//!
//! # Architecture Overview
//!
//! ```text
//!   topology.toml ──▶ config::loader ──▶ config::validation
//!                                              │
//!                                              ▼
//!   publish(exchange, key) ──────────────▶ routing::Router ──▶ { queue ids }
//!                                              ▲
//!   file change ──▶ config::watcher ──▶ lifecycle::reload (atomic swap)
//!
//!   failed delivery ──▶ resilience::RetryPolicy ──▶ <ex>_retry | <ex>_dlq
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use exchange_router::config::watcher::ConfigWatcher;
use exchange_router::config::{load_config, TopologyConfig};
use exchange_router::lifecycle::{reload, signals, Shutdown};
use exchange_router::observability::{logging, metrics};
use exchange_router::resilience::backoff;
use exchange_router::resilience::retries::retry_queue_name;
use exchange_router::routing::{Router, TopicPattern};

#[derive(Parser)]
#[command(name = "exchange-router")]
#[command(about = "Direct, fanout and topic exchange routing", long_about = None)]
struct Cli {
    /// Topology file.
    #[arg(short, long, default_value = "topology.toml")]
    config: PathBuf,

    /// Log level; overrides the topology file. `RUST_LOG` overrides both.
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the topology file
    Validate,
    /// Print the queues a routing key is delivered to
    Route {
        #[arg(short, long)]
        exchange: String,
        #[arg(short, long, default_value = "")]
        key: String,
    },
    /// Evaluate a single topic pattern against a routing key
    Match {
        #[arg(short, long)]
        pattern: String,
        #[arg(short, long)]
        key: String,
    },
    /// Dump exchanges and bindings as JSON
    Bindings,
    /// Print the retry delay schedule
    Backoff,
    /// Keep the routing table loaded and hot-reload it on file changes
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Match { pattern, key } = &cli.command {
        logging::init(cli.log_level.as_deref().unwrap_or("info"));
        let compiled = TopicPattern::parse(pattern)?;
        let matched = compiled.matches(key);
        println!(
            "{}",
            serde_json::json!({ "pattern": pattern, "key": key, "matched": matched })
        );
        return Ok(());
    }

    let config = load_config(&cli.config)?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    logging::init(&level);

    tracing::info!(
        path = ?cli.config,
        exchanges = config.exchanges.len(),
        bindings = config.bindings.len(),
        "Topology loaded"
    );

    let router = Arc::new(Router::from_config(&config)?);

    match cli.command {
        Commands::Validate => {
            let table = router.snapshot();
            println!(
                "ok: {} exchanges, {} bindings",
                table.exchange_count(),
                table.binding_count()
            );
        }
        Commands::Route { exchange, key } => {
            let queues = router.route(&exchange, &key)?;
            println!("{}", serde_json::to_string_pretty(&queues)?);
        }
        Commands::Bindings => {
            let summaries = router.snapshot().summaries();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Commands::Backoff => {
            for (retry_count, delay) in backoff::schedule(&config.retry).iter().enumerate() {
                println!(
                    "attempt {}: {} ms ({})",
                    retry_count + 1,
                    delay.as_millis(),
                    retry_queue_name(*delay)
                );
            }
        }
        Commands::Serve => serve(cli.config, config, router).await?,
        Commands::Match { .. } => unreachable!("handled before loading topology"),
    }

    Ok(())
}

async fn serve(
    path: PathBuf,
    config: TopologyConfig,
    router: Arc<Router>,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    let (watcher, updates) = ConfigWatcher::new(&path);
    // Dropping the handle stops the watch.
    let _watch_handle = watcher.run()?;

    tokio::spawn(signals::shutdown_on_ctrl_c(shutdown.clone()));

    tracing::info!("Serving routing table, press Ctrl+C to stop");
    let applied = reload::run_reload_loop(router, updates, shutdown.subscribe()).await;

    tracing::info!(reloads = applied, "Shutdown complete");
    Ok(())
}
