use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "rewardd")]
#[command(about = "Reward ledger and payout daemon", long_about = None)]
pub struct Args {
    /// Path to configuration file (optional, uses defaults if not found)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// SQLite database path
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// HTTP API port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Seconds between payout cycles
    #[arg(long)]
    pub payout_interval: Option<u64>,

    /// Pay out through the in-memory gateway (development only)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API and the payout worker (default)
    Serve,
    /// Create the schema and seed the catalog, then exit
    Migrate,
    /// Run a single payout cycle and print the report
    PayoutOnce,
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}

pub fn parse_args() -> Args {
    Args::parse()
}
