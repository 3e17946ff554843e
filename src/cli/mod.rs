pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::render::DEFAULT_CALLBACK;

#[derive(Parser)]
#[command(name = "confluence")]
#[command(about = "A river-of-news feed aggregator", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/confluence/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Skip the initial fetch; every feed waits one poll interval
    #[arg(long, global = true)]
    pub quick_start: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll all rivers until interrupted, reloading the config on change
    Run,
    /// Print a river as River.js JSON
    Show {
        /// Name of the river
        river: String,

        /// Wrap the JSON in a JSONP callback
        #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_CALLBACK)]
        callback: Option<String>,
    },
    /// Print a river's feed list as OPML
    Opml {
        /// Name of the river
        river: String,
    },
    /// Validate the config and list the configured rivers
    Check,
}
