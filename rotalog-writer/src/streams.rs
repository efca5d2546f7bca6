//! The four named log streams of a process, built from one [`LogConfig`].
//!
//! ```text
//! <dir>/access.log   info   [INFO]
//! <dir>/error.log    error  [ERROR]   (+ rate-limited stack reports)
//! <dir>/slow.log     slow   [SLOW]
//! <dir>/stat.log     stat   [STAT]
//! ```
//!
//! Each file stream is an independent [`RotatingWriter`] over a
//! [`DailyRotationPolicy`]. In console mode the streams go to stdout, with
//! errors on stderr.

use std::backtrace::Backtrace;
use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;

use rotalog_core::format::{ensure_newline, with_time, with_time_and_caller};
use rotalog_core::paths::{self, Stream};
use rotalog_core::{LogConfig, LogMode, SharedClock, SystemClock};

use crate::error::WriterError;
use crate::housekeeping;
use crate::limiter::RateLimitedSink;
use crate::policy::{DailyRotationPolicy, RotationPolicy};
use crate::sink::{ConsoleSink, ConsoleTarget, LogSink};
use crate::writer::{RotatingWriter, WriterOptions};

pub struct LogStreams {
    mode: LogMode,
    info: Arc<dyn LogSink>,
    error: Arc<dyn LogSink>,
    slow: Arc<dyn LogSink>,
    stat: Arc<dyn LogSink>,
    stack: RateLimitedSink,
    clock: SharedClock,
}

impl LogStreams {
    pub fn setup(config: &LogConfig) -> Result<Self, WriterError> {
        Self::setup_with_clock(config, SystemClock::shared())
    }

    /// Build every stream. Construction errors are returned before any
    /// stream is used; streams already opened are closed when dropped.
    pub fn setup_with_clock(config: &LogConfig, clock: SharedClock) -> Result<Self, WriterError> {
        config.validate()?;

        let build = |stream: Stream| -> Result<Arc<dyn LogSink>, WriterError> {
            match config.mode {
                LogMode::Console => {
                    let target = match stream {
                        Stream::Error => ConsoleTarget::Stderr,
                        Stream::Info | Stream::Slow | Stream::Stat => ConsoleTarget::Stdout,
                    };
                    Ok(Arc::new(ConsoleSink::new(target, stream.prefix())))
                }
                LogMode::Regular | LogMode::Volume => {
                    let path = paths::stream_path(&config.resolved_dir()?, stream);
                    let policy = daily_policy(config, stream, path.clone(), clock.clone());
                    let options = WriterOptions {
                        mirror_to_console: config.stdout,
                        compress: config.compress,
                        queue_capacity: config.queue_capacity,
                    };
                    Ok(Arc::new(RotatingWriter::new(path, policy, options)?))
                }
            }
        };

        let info = build(Stream::Info)?;
        let error = build(Stream::Error)?;
        let slow = build(Stream::Slow)?;
        let stat = build(Stream::Stat)?;

        let stack = RateLimitedSink::with_clock(config.stack_cooldown_millis, clock.clone())
            .with_notice({
                let error = error.clone();
                let clock = clock.clone();
                move |discarded| {
                    let line = with_time(clock.as_ref(), &format!("Discarded {discarded} error messages\n"));
                    if let Err(err) = error.write(line.as_bytes()) {
                        tracing::warn!(error = %err, "failed to write discard notice");
                    }
                }
            });

        Ok(Self {
            mode: config.mode,
            info,
            error,
            slow,
            stat,
            stack,
            clock,
        })
    }

    pub fn mode(&self) -> LogMode {
        self.mode
    }

    pub fn sink(&self, stream: Stream) -> &dyn LogSink {
        match stream {
            Stream::Info => self.info.as_ref(),
            Stream::Error => self.error.as_ref(),
            Stream::Slow => self.slow.as_ref(),
            Stream::Stat => self.stat.as_ref(),
        }
    }

    /// Timestamp `msg` and append it to `stream`.
    pub fn write_line(&self, stream: Stream, msg: &str) {
        let line = ensure_newline(with_time(self.clock.as_ref(), msg));
        self.emit(stream, &line);
    }

    pub fn info(&self, msg: &str) {
        self.write_line(Stream::Info, msg);
    }

    pub fn slow(&self, msg: &str) {
        self.write_line(Stream::Slow, msg);
    }

    pub fn stat(&self, msg: &str) {
        self.write_line(Stream::Stat, msg);
    }

    /// Error line tagged with the caller's `file:line`.
    #[track_caller]
    pub fn error(&self, msg: &str) {
        let location = Location::caller();
        self.error_at(location, msg);
    }

    /// Error line with a captured backtrace, at most once per cooldown window.
    #[track_caller]
    pub fn stack(&self, msg: &str) {
        let location = Location::caller();
        self.stack.emit(|| {
            let trace = Backtrace::force_capture();
            self.error_at(location, &format!("{msg}\n{trace}"));
        });
    }

    /// Close every stream. All streams are closed even if one fails; the
    /// first error is returned.
    pub fn close(&self) -> Result<(), WriterError> {
        let mut first = None;
        for stream in Stream::ALL {
            if let Err(err) = self.sink(stream).close() {
                tracing::error!(stream = %stream, error = %err, "failed to close log stream");
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }

    fn error_at(&self, location: &Location<'_>, msg: &str) {
        let line = ensure_newline(with_time_and_caller(self.clock.as_ref(), location, msg));
        self.emit(Stream::Error, &line);
    }

    fn emit(&self, stream: Stream, line: &str) {
        if let Err(err) = self.sink(stream).write(line.as_bytes()) {
            tracing::warn!(stream = %stream, error = %err, "log write failed");
        }
    }
}

fn daily_policy(
    config: &LogConfig,
    stream: Stream,
    path: PathBuf,
    clock: SharedClock,
) -> DailyRotationPolicy {
    DailyRotationPolicy::new(
        path,
        stream.prefix(),
        config.delimiter.clone(),
        config.keep_days,
        config.compress,
        clock,
    )
}

/// Live file path of every stream. Empty in console mode.
pub fn stream_paths(config: &LogConfig) -> Result<Vec<(Stream, PathBuf)>, WriterError> {
    config.validate()?;
    if config.mode == LogMode::Console {
        return Ok(Vec::new());
    }
    let dir = config.resolved_dir()?;
    Ok(Stream::ALL
        .into_iter()
        .map(|stream| (stream, paths::stream_path(&dir, stream)))
        .collect())
}

/// Delete every backup that fell out of the retention window, for all
/// streams. Returns the removed paths.
pub fn prune(config: &LogConfig, clock: SharedClock) -> Result<Vec<PathBuf>, WriterError> {
    let mut removed = Vec::new();
    for (stream, path) in stream_paths(config)? {
        let policy = daily_policy(config, stream, path, clock.clone());
        removed.extend(housekeeping::delete_files(&policy.outdated_files()));
    }
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    use rotalog_core::ManualClock;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> LogConfig {
        LogConfig {
            path: dir.path().to_path_buf(),
            ..LogConfig::default()
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::at_date(2024, 6, 1).expect("date"))
    }

    #[test]
    fn each_stream_gets_its_own_file_and_prefix() {
        let dir = TempDir::new().unwrap();
        let streams = LogStreams::setup_with_clock(&config(&dir), clock()).unwrap();

        streams.info("served /");
        streams.slow("query took 3s");
        streams.stat("qps=10");
        streams.error("upstream down");
        streams.close().unwrap();

        let read = |name: &str| fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("access.log"), "[INFO] 2024-06-01 12:00:00.000 served /\n");
        assert_eq!(read("slow.log"), "[SLOW] 2024-06-01 12:00:00.000 query took 3s\n");
        assert_eq!(read("stat.log"), "[STAT] 2024-06-01 12:00:00.000 qps=10\n");

        let error = read("error.log");
        assert!(error.starts_with("[ERROR] 2024-06-01 12:00:00.000 streams.rs:"), "got: {error}");
        assert!(error.ends_with(" upstream down\n"));
    }

    #[test]
    fn stack_reports_are_rate_limited_with_discard_notice() {
        let dir = TempDir::new().unwrap();
        let clock = clock();
        let streams = LogStreams::setup_with_clock(&config(&dir), clock.clone()).unwrap();

        for _ in 0..5 {
            streams.stack("panic in handler");
            clock.advance(Duration::from_millis(10));
        }
        clock.advance(Duration::from_millis(200));
        streams.stack("panic in handler");
        streams.close().unwrap();

        let error = fs::read_to_string(dir.path().join("error.log")).unwrap();
        assert_eq!(error.matches("panic in handler").count(), 2);
        assert!(error.contains("Discarded 4 error messages"), "got: {error}");
    }

    #[test]
    fn close_is_idempotent_and_rejects_late_writes() {
        let dir = TempDir::new().unwrap();
        let streams = LogStreams::setup_with_clock(&config(&dir), clock()).unwrap();
        streams.close().unwrap();
        streams.close().unwrap();

        let err = streams.sink(Stream::Info).write(b"late\n").unwrap_err();
        assert!(matches!(err, WriterError::LogClosed));
    }

    #[test]
    fn console_mode_creates_no_files() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            mode: LogMode::Console,
            ..config(&dir)
        };
        let streams = LogStreams::setup_with_clock(&config, clock()).unwrap();
        streams.info("to stdout");
        streams.close().unwrap();

        assert_eq!(streams.mode(), LogMode::Console);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(stream_paths(&config).unwrap().is_empty());
    }

    #[test]
    fn prune_removes_only_stale_backups() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            keep_days: 3,
            ..config(&dir)
        };
        for name in [
            "access.log-2024-05-20",
            "access.log-2024-05-29",
            "error.log-2024-05-01",
            "slow.log-2024-05-30",
        ] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let mut removed = prune(&config, clock()).unwrap();
        removed.sort();
        assert_eq!(
            removed,
            vec![
                dir.path().join("access.log-2024-05-20"),
                dir.path().join("error.log-2024-05-01"),
            ]
        );
        assert!(dir.path().join("access.log-2024-05-29").exists());
        assert!(dir.path().join("slow.log-2024-05-30").exists());
    }
}
