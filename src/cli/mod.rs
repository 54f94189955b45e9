//! Command-line interface definitions.

pub mod banner;
pub mod check;
mod output;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cross-venue arbitrage detection and execution engine.
#[derive(Parser, Debug)]
#[command(name = "arbcore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Detect opportunities but don't execute trades
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the arbitrage engine (foreground, blocks until Ctrl+C)
    Run(RunArgs),

    /// Validate configuration and print a health report, no network calls
    Check,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Skip the start-of-run banner
    #[arg(long)]
    pub no_banner: bool,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}
