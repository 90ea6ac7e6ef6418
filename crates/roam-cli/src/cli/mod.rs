//! CLI for the roam offline map cache.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use roam_core::config;
use roam_core::engine::MapEngine;
use roam_core::network::{FixedNetwork, NetworkMonitor};
use std::sync::Arc;

use commands::{
    parse_network, run_autoupdate, run_check, run_covered, run_fetch, run_list, run_remove,
    run_snapshot, run_usage, run_watch,
};

/// Top-level CLI for the roam offline map cache.
#[derive(Debug, Parser)]
#[command(name = "roam")]
#[command(about = "roam: offline map region cache and tile downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a map region for offline use.
    Fetch {
        /// Stable region identifier, e.g. "seoul".
        #[arg(long)]
        id: String,

        /// Human-readable region name.
        #[arg(long)]
        name: String,

        /// North-east corner as "lat,lon".
        #[arg(long)]
        ne: String,

        /// South-west corner as "lat,lon".
        #[arg(long)]
        sw: String,

        /// Estimated region size counted against the cache quota.
        #[arg(long, value_name = "MB")]
        size_mb: f64,
    },

    /// Show all cached regions.
    List,

    /// Remove a region (or every region) together with its tile files.
    Remove {
        /// Region identifier.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Remove every region.
        #[arg(long)]
        all: bool,
    },

    /// Check whether a point is covered by an available region.
    Covered {
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
    },

    /// Show cache usage against the configured quota.
    Usage,

    /// Run one auto-update condition check and report the outcome.
    Check {
        /// Evaluate against this network class instead of wifi.
        #[arg(long, value_name = "CLASS")]
        network: Option<String>,

        /// Evaluate as if the scheduled check time were now.
        #[arg(long)]
        force_window: bool,
    },

    /// Run the hourly auto-update daemon until Ctrl-C.
    Watch {
        /// Evaluate against this network class instead of wifi.
        #[arg(long, value_name = "CLASS")]
        network: Option<String>,
    },

    /// Show or change the persisted auto-update settings.
    Autoupdate {
        #[command(subcommand)]
        action: AutoUpdateAction,
    },

    /// Inspect or clear the map snapshot cache.
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum AutoUpdateAction {
    /// Print the persisted settings.
    Show,

    /// Update one or more settings fields.
    Set {
        /// Turn scheduled updates on or off.
        #[arg(long)]
        enabled: Option<bool>,

        /// Restrict scheduled downloads to wifi.
        #[arg(long)]
        wifi_only: Option<bool>,

        /// daily, weekly, monthly or never.
        #[arg(long)]
        interval: Option<String>,

        /// Scheduled check time as "HH:MM" local time.
        #[arg(long)]
        time_of_day: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SnapshotAction {
    /// Show the active snapshot metadata.
    Info,

    /// List every snapshot catalog entry.
    List,

    /// Drop one named catalog entry, or the whole cache.
    Clear {
        /// Catalog entry name; clears everything when omitted.
        name: Option<String>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        let network: Arc<dyn NetworkMonitor> = match &cli.command {
            CliCommand::Check {
                network: Some(class),
                ..
            }
            | CliCommand::Watch {
                network: Some(class),
            } => Arc::new(FixedNetwork::new(parse_network(class)?)),
            _ => Arc::new(FixedNetwork::default()),
        };
        let engine = MapEngine::open_with(cfg, network).await?;

        match cli.command {
            CliCommand::Fetch {
                id,
                name,
                ne,
                sw,
                size_mb,
            } => run_fetch(&engine, &id, &name, &ne, &sw, size_mb).await?,
            CliCommand::List => run_list(&engine).await?,
            CliCommand::Remove { id, all } => run_remove(&engine, id.as_deref(), all).await?,
            CliCommand::Covered { lat, lon } => run_covered(&engine, lat, lon).await?,
            CliCommand::Usage => run_usage(&engine).await?,
            CliCommand::Check { force_window, .. } => run_check(&engine, force_window).await?,
            CliCommand::Watch { .. } => run_watch(&engine).await?,
            CliCommand::Autoupdate { action } => run_autoupdate(&engine, action).await?,
            CliCommand::Snapshot { action } => run_snapshot(&engine, action).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
