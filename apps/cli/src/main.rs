//! geofence - headless single-region presence tracker.
//!
//! Region and presence persist in SQLite between invocations, so a region
//! activated by one run keeps applying transitions replayed by the next.

mod config;
mod replay;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::GeofenceConfig;
use geofence_events::TracingEventBus;
use geofence_region::{Coordinate, PresenceState, Region, Status};
use geofence_storage::RegionStateStore;
use geofence_tracker::GeofenceTracker;
use replay::{ReplayMonitor, ReplaySource};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "geofence")]
#[command(about = "Track presence inside a single circular region", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// State database (overrides the config file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a region and register it for monitoring
    Activate {
        /// Center latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Center longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Radius in meters
        #[arg(long, default_value = "100")]
        radius: f32,
    },
    /// Stop monitoring and forget the region
    Deactivate,
    /// Re-register the stored region
    Retry,
    /// Print region, presence and status
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Apply newline-delimited JSON transition events ("-" for stdin)
    Replay { path: PathBuf },
}

#[derive(Serialize)]
struct Snapshot {
    region: Option<Region>,
    presence: PresenceState,
    status: Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = GeofenceConfig::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let store = Arc::new(
        RegionStateStore::open(&config.database_path)
            .with_context(|| format!("opening {}", config.database_path.display()))?,
    );
    let tracker = GeofenceTracker::new(
        Arc::clone(&store),
        Arc::new(ReplayMonitor),
        Arc::new(TracingEventBus),
        config.tracker.clone(),
    );

    match cli.command {
        Command::Activate { lat, lon, radius } => {
            let region = tracker
                .activate_region(Coordinate::new(lat, lon), radius)
                .await?;
            println!("active: {region}");
        }
        Command::Deactivate => {
            tracker.deactivate_region().await?;
            println!("idle");
        }
        Command::Retry => {
            let region = tracker.retry_registration().await?;
            println!("active: {region}");
        }
        Command::Show { json } => {
            let snapshot = Snapshot {
                region: store.region()?,
                presence: store.presence()?,
                status: tracker.status(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                match snapshot.region {
                    Some(region) => println!("region:   {region}"),
                    None => println!("region:   none"),
                }
                println!("presence: {}", snapshot.presence);
                println!("status:   {}", snapshot.status);
            }
        }
        Command::Replay { path } => {
            let mut presence = store.subscribe_presence();
            // Skip the replayed current value; only changes are printed.
            presence.try_recv();

            let reader = ReplaySource::from_arg(path).open().await?;
            let summary = tracker.consume(replay::transition_events(reader)).await;

            while let Some(state) = presence.try_recv() {
                println!("presence: {state}");
            }
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    Ok(())
}
