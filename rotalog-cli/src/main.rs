//! rotalog — daily rotating log files from the command line.
//!
//! # Usage
//!
//! ```text
//! rotalog pipe  --config <yaml> [--stream info|error|slow|stat] [--raw]
//! rotalog prune --config <yaml>
//! rotalog paths --config <yaml> [--json]
//! ```

mod commands;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{paths::PathsArgs, pipe::PipeArgs, prune::PruneArgs};
use rotalog_core::LogConfig;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "rotalog",
    version,
    about = "Append to, inspect and prune daily rotating log files",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append stdin, line by line, to one log stream.
    Pipe(PipeArgs),

    /// Delete backups older than the configured retention.
    Prune(PruneArgs),

    /// Print the live file path of every stream.
    Paths(PathsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Pipe(args) => args.run(),
        Commands::Prune(args) => args.run(),
        Commands::Paths(args) => args.run(),
    }
}

/// Diagnostics go to stderr so they never mix with piped log data.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub(crate) fn load_config(path: &Path) -> Result<LogConfig> {
    LogConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))
}
