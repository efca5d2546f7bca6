//! `rotalog paths` — where each stream is written.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use rotalog_core::{LogMode, Stream};

/// Arguments for `rotalog paths`.
#[derive(Args, Debug)]
pub struct PathsArgs {
    /// YAML log configuration.
    #[arg(long)]
    pub config: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StreamPathJson {
    stream: Stream,
    path: PathBuf,
}

impl PathsArgs {
    pub fn run(self) -> Result<()> {
        let config = crate::load_config(&self.config)?;
        let paths = rotalog_writer::stream_paths(&config).context("failed to resolve log paths")?;

        if self.json {
            let rows: Vec<StreamPathJson> = paths
                .into_iter()
                .map(|(stream, path)| StreamPathJson { stream, path })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        if config.mode == LogMode::Console {
            println!("Console mode: streams go to stdout and stderr.");
            return Ok(());
        }
        for (stream, path) in paths {
            println!("{:<6} {}", stream.to_string(), path.display());
        }
        Ok(())
    }
}
