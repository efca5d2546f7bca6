//! `rotalog prune` — delete backups that fell out of the retention window.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use rotalog_core::SystemClock;

/// Arguments for `rotalog prune`.
#[derive(Args, Debug)]
pub struct PruneArgs {
    /// YAML log configuration.
    #[arg(long)]
    pub config: PathBuf,
}

impl PruneArgs {
    pub fn run(self) -> Result<()> {
        let config = crate::load_config(&self.config)?;
        if config.keep_days <= 0 {
            println!("Retention is disabled (keep_days = {}).", config.keep_days);
            return Ok(());
        }

        let removed = rotalog_writer::prune(&config, SystemClock::shared())
            .context("failed to prune log backups")?;
        if removed.is_empty() {
            println!("No outdated backups.");
        }
        for path in &removed {
            println!("removed {}", path.display());
        }
        Ok(())
    }
}
