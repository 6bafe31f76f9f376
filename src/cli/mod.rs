pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lightbox")]
#[command(about = "A local photo-catalog cache with incremental sync", long_about = None)]
pub struct Cli {
    /// Database path (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mirror the whole remote catalog into the local cache
    Sync,
    /// List cached photos
    List {
        /// Show only favorites
        #[arg(long)]
        favorites: bool,
    },
    /// Show one photo in detail
    Show {
        /// Photo id
        id: String,
    },
    /// Toggle the favorite flag on a photo
    Favorite {
        /// Photo id
        id: String,
    },
    /// Show cache freshness
    Status,
    /// Follow the sync banner, triggering a visual sync first
    Watch,
    /// Background daemon for periodic refreshes
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand)]
pub enum DaemonAction {
    /// Start the daemon in the foreground
    Start {
        /// Refresh interval (e.g. "1h", "30m", "6h", "1d")
        #[arg(short, long)]
        interval: Option<String>,

        /// Skip the initial refresh on start
        #[arg(long)]
        no_initial_update: bool,

        /// Log file path (default: stdout)
        #[arg(short, long)]
        log: Option<std::path::PathBuf>,
    },
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
}
