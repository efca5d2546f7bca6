//! Process-wide log streams.
//!
//! [`setup`] installs one [`LogStreams`] for the whole process; the free
//! functions write through it. Before setup (or after [`close`]) they fall
//! back to the console so early messages are not lost.

use std::io::Write;
use std::panic::Location;
use std::sync::Arc;

use parking_lot::RwLock;
use rotalog_core::format::{ensure_newline, with_time, with_time_and_caller};
use rotalog_core::paths::{self, Stream};
use rotalog_core::{LogConfig, SystemClock};

use crate::error::WriterError;
use crate::streams::LogStreams;

static STREAMS: RwLock<Option<Arc<LogStreams>>> = parking_lot::const_rwlock(None);

/// Install the process-wide streams. Calls after a successful setup are
/// no-ops until [`close`].
pub fn setup(config: &LogConfig) -> Result<(), WriterError> {
    let mut guard = STREAMS.write();
    if guard.is_some() {
        return Ok(());
    }
    *guard = Some(Arc::new(LogStreams::setup(config)?));
    Ok(())
}

pub fn is_initialized() -> bool {
    STREAMS.read().is_some()
}

/// The installed streams, if any.
pub fn streams() -> Option<Arc<LogStreams>> {
    STREAMS.read().clone()
}

/// Close and uninstall the process-wide streams.
pub fn close() -> Result<(), WriterError> {
    let streams = STREAMS.write().take().ok_or(WriterError::NotInitialized)?;
    streams.close()
}

pub fn info(msg: &str) {
    match streams() {
        Some(streams) => streams.info(msg),
        None => console(Stream::Info, msg),
    }
}

pub fn slow(msg: &str) {
    match streams() {
        Some(streams) => streams.slow(msg),
        None => console(Stream::Slow, msg),
    }
}

pub fn stat(msg: &str) {
    match streams() {
        Some(streams) => streams.stat(msg),
        None => console(Stream::Stat, msg),
    }
}

#[track_caller]
pub fn error(msg: &str) {
    match streams() {
        Some(streams) => streams.error(msg),
        None => console_error(paths::ERROR_PREFIX, Location::caller(), msg),
    }
}

/// Error with a backtrace, rate limited once set up.
#[track_caller]
pub fn stack(msg: &str) {
    match streams() {
        Some(streams) => streams.stack(msg),
        None => {
            let trace = std::backtrace::Backtrace::force_capture();
            console_error(paths::STACK_PREFIX, Location::caller(), &format!("{msg}\n{trace}"));
        }
    }
}

fn console(stream: Stream, msg: &str) {
    let line = ensure_newline(format!("{}{}", stream.prefix(), with_time(&SystemClock, msg)));
    let _ = std::io::stdout().lock().write_all(line.as_bytes());
}

fn console_error(prefix: &str, location: &Location<'_>, msg: &str) {
    let line = ensure_newline(format!(
        "{prefix}{}",
        with_time_and_caller(&SystemClock, location, msg)
    ));
    let _ = std::io::stderr().lock().write_all(line.as_bytes());
}
