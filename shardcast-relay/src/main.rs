//! Shardcast Relay
//!
//! Replays a JSON-lines feed of gateway occurrences through an `EventHub`,
//! one lane per shard, and reports what was delivered.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod config;
mod input;
mod observers;
mod shutdown;

use clap::Parser;
use config::ConfigLoader;
use input::FeedStats;
use shardcast_core::EventHub;
use shutdown::shutdown_signal;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Shardcast Relay - dispatch a recorded gateway feed to subscribers
#[derive(Parser, Debug)]
#[command(name = "shardcast-relay")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./shardcast.toml")]
    config: PathBuf,

    /// JSON-lines feed to replay, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Override the number of shard lanes
    #[arg(short, long, env = "SHARDCAST_SHARDS")]
    shards: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // The log filter comes from the config, so load it first.
    let loaded = ConfigLoader::new(&args.config, args.shards).load()?;
    init_tracing(&loaded.log_filter);

    tracing::info!("Starting shardcast-relay v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Configuration loaded from {:?}", args.config);

    let hub = EventHub::new(loaded.dispatch);
    let counters = observers::install(hub.registry());

    let source = input::open(&args.input).await.map_err(|e| {
        tracing::error!("Failed to open input {}: {}", args.input, e);
        e
    })?;

    let mut stats = FeedStats::default();
    let result = tokio::select! {
        fed = input::feed(source, &hub, &mut stats) => {
            tracing::info!("End of input reached");
            fed
        }
        signal = shutdown_signal() => signal,
    };

    if let Err(e) = &result {
        tracing::error!("Feed stopped early: {}", e);
    }

    tracing::info!(
        submitted = stats.submitted,
        malformed = stats.malformed,
        rejected = stats.rejected,
        "Feed summary"
    );

    // Lanes route their backlog before the hub lets go of subscribers.
    hub.shutdown().await;
    counters.log_summary();
    tracing::info!("Relay shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber. `RUST_LOG` takes precedence over `default_filter`.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
