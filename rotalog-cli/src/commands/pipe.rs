//! `rotalog pipe` — append stdin to a log stream until EOF or ctrl-c.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};

use rotalog_core::Stream;
use rotalog_writer::LogStreams;

/// Arguments for `rotalog pipe`.
#[derive(Args, Debug)]
pub struct PipeArgs {
    /// YAML log configuration.
    #[arg(long)]
    pub config: PathBuf,

    /// Stream that receives the lines.
    #[arg(long, default_value = "info")]
    pub stream: Stream,

    /// Write lines as-is, without the timestamp.
    #[arg(long)]
    pub raw: bool,
}

impl PipeArgs {
    pub fn run(self) -> Result<()> {
        let config = crate::load_config(&self.config)?;
        let streams = LogStreams::setup(&config).context("failed to open log streams")?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        let copied = runtime.block_on(self.copy_stdin(&streams));

        // Close even when reading failed, so queued lines reach disk.
        streams.close().context("failed to close log streams")?;
        let lines = copied?;
        tracing::info!(lines, stream = %self.stream, "stdin closed");
        Ok(())
    }

    async fn copy_stdin(&self, streams: &LogStreams) -> Result<u64> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut count = 0u64;
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line.context("failed to read stdin")?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupted");
                    None
                }
            };
            let Some(line) = line else {
                return Ok(count);
            };
            // The writer blocks while its queue is full.
            tokio::task::block_in_place(|| self.append(streams, &line));
            count += 1;
        }
    }

    fn append(&self, streams: &LogStreams, line: &str) {
        if !self.raw {
            streams.write_line(self.stream, line);
            return;
        }
        let record = format!("{line}\n");
        if let Err(err) = streams.sink(self.stream).write(record.as_bytes()) {
            tracing::warn!(stream = %self.stream, error = %err, "log write failed");
        }
    }
}
