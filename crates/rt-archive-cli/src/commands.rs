use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rt-archive")]
#[command(about = "Track how much of the Rooster Teeth catalog is mirrored", long_about = None)]
pub struct Cli {
    /// Debug-level logging for this tool (overridden by `TRACING_LEVEL`)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch every source, reconcile, and write the checklist and site data
    Update {
        /// Print the summary without writing any artifacts
        #[arg(long)]
        dry_run: bool,
    },
    /// Check which catalog items are not fully present in a local download library
    CheckLocal {
        /// Library root (overrides `local.root`)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print configuration values
    PrintConfig,
}
