use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "reclaimarr")]
#[command(about = "Find media that can go, and delete it after approval", long_about = None)]
pub struct Cli {
    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the libraries and publish a new decision set
    Analyze,
    /// Print the latest decision set
    Show,
    /// Delete items of the latest decision set
    Execute {
        /// Item ids to delete (default: every auto-recommended movie)
        ids: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Summary of the latest run
    Stats,
    /// Check that Plex and the trackers respond
    Health,
    /// Remove old decision sets and backup logs
    Cleanup {
        /// Number of decision sets to keep
        #[arg(long, default_value_t = 10)]
        keep: usize,
    },
}
