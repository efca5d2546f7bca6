//! Asynchronous rotating file writer.
//!
//! ```text
//! [write()] ─┬─> bounded queue ──> [worker thread] ──> target file
//!            │                          │ rotation due?
//!            └─ closed? → LogClosed     └─> rename → spawn housekeeping → create
//! ```
//!
//! Producers only touch the queue. The worker thread owns the file handle and
//! the policy, so rotation is always evaluated immediately before the write
//! that triggers it. Housekeeping gets a detached retention scan and never
//! touches either.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Select, Sender};
use parking_lot::Mutex;
use rotalog_core::config::DEFAULT_QUEUE_CAPACITY;

use crate::error::{io_err, WriterError};
use crate::housekeeping;
use crate::policy::RotationPolicy;
use crate::sink::LogSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Echo every accepted record to stdout.
    pub mirror_to_console: bool,
    /// Gzip rotated files during housekeeping.
    pub compress: bool,
    /// Records that may be queued before `write` blocks. Clamped to at least 1.
    pub queue_capacity: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            mirror_to_console: false,
            compress: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

enum CloseState {
    Open {
        /// Dropping the only sender disconnects every `done` receiver.
        done: Sender<()>,
        worker: JoinHandle<Option<File>>,
    },
    Closed(Result<(), (io::ErrorKind, String)>),
}

/// A log file fed by a single background worker thread.
pub struct RotatingWriter {
    target_path: PathBuf,
    prefix: String,
    mirror_to_console: bool,
    records: Sender<Vec<u8>>,
    done: Receiver<()>,
    closed: Arc<AtomicBool>,
    state: Mutex<CloseState>,
}

impl RotatingWriter {
    /// Open (append) or create `target_path`, creating missing parent
    /// directories, and start the worker thread.
    pub fn new(
        target_path: impl Into<PathBuf>,
        policy: impl RotationPolicy,
        options: WriterOptions,
    ) -> Result<Self, WriterError> {
        let target_path = target_path.into();
        let file = open_target(&target_path)?;

        let prefix = policy.prefix().to_owned();
        let pending_backup = policy.backup_name();
        let policy: Box<dyn RotationPolicy> = Box::new(policy);

        let (records_tx, records_rx) = channel::bounded::<Vec<u8>>(options.queue_capacity.max(1));
        let (done_tx, done_rx) = channel::bounded::<()>(0);
        let closed = Arc::new(AtomicBool::new(false));

        let mut worker = Worker {
            target_path: target_path.clone(),
            pending_backup,
            file: Some(file),
            policy,
            compress: options.compress,
            reported_missing: false,
        };
        let worker = {
            let done = done_rx.clone();
            let closed = closed.clone();
            thread::Builder::new()
                .name("rotalog-writer".to_owned())
                .spawn(move || {
                    worker.run(&records_rx, &done, &closed);
                    worker.file
                })
                .map_err(|e| io_err(&target_path, e))?
        };

        Ok(Self {
            target_path,
            prefix,
            mirror_to_console: options.mirror_to_console,
            records: records_tx,
            done: done_rx,
            closed,
            state: Mutex::new(CloseState::Open {
                done: done_tx,
                worker,
            }),
        })
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Prefix `data` and queue it for the worker.
    ///
    /// Blocks while the queue is full. A close that happens while blocked
    /// releases the caller with [`WriterError::LogClosed`]. Returns the length
    /// of the prefixed record.
    pub fn write(&self, data: &[u8]) -> Result<usize, WriterError> {
        let mut record = Vec::with_capacity(self.prefix.len() + data.len());
        record.extend_from_slice(self.prefix.as_bytes());
        record.extend_from_slice(data);
        let len = record.len();

        if self.is_closed() {
            return Err(reject(&record));
        }
        let mirror = self.mirror_to_console.then(|| record.clone());

        let mut select = Select::new();
        let send_op = select.send(&self.records);
        let done_op = select.recv(&self.done);
        let oper = select.select();
        match oper.index() {
            i if i == send_op => match oper.send(&self.records, record) {
                Ok(()) => {
                    if let Some(mirror) = mirror {
                        // Mirroring is best-effort.
                        let _ = io::stdout().lock().write_all(&mirror);
                    }
                    Ok(len)
                }
                Err(channel::SendError(record)) => Err(reject(&record)),
            },
            i if i == done_op => {
                let _ = oper.recv(&self.done);
                Err(reject(&record))
            }
            _ => unreachable!("select returned an unregistered operation"),
        }
    }

    /// Stop the worker, then sync and release the file.
    ///
    /// Only the first call does any work; later calls return the first
    /// call's outcome. Concurrent callers wait for the first to finish.
    pub fn close(&self) -> Result<(), WriterError> {
        let mut state = self.state.lock();
        let (done, worker) = match std::mem::replace(&mut *state, CloseState::Closed(Ok(()))) {
            CloseState::Open { done, worker } => (done, worker),
            CloseState::Closed(outcome) => {
                let result = self.outcome_to_result(&outcome);
                *state = CloseState::Closed(outcome);
                return result;
            }
        };

        self.closed.store(true, Ordering::Release);
        drop(done);

        let outcome = match worker.join() {
            Ok(Some(file)) => file
                .sync_all()
                .map_err(|e| (e.kind(), e.to_string())),
            Ok(None) => Ok(()),
            Err(_) => Err((io::ErrorKind::Other, "log writer thread panicked".to_owned())),
        };
        let result = self.outcome_to_result(&outcome);
        *state = CloseState::Closed(outcome);
        result
    }

    fn outcome_to_result(&self, outcome: &Result<(), (io::ErrorKind, String)>) -> Result<(), WriterError> {
        match outcome {
            Ok(()) => Ok(()),
            Err((kind, message)) => Err(io_err(&self.target_path, io::Error::new(*kind, message.clone()))),
        }
    }
}

impl LogSink for RotatingWriter {
    fn write(&self, data: &[u8]) -> Result<usize, WriterError> {
        RotatingWriter::write(self, data)
    }

    fn close(&self) -> Result<(), WriterError> {
        RotatingWriter::close(self)
    }
}

impl Drop for RotatingWriter {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(path = %self.target_path.display(), error = %err, "failed to close log file");
        }
    }
}

/// Echo a record that can no longer reach disk so the operator still sees it.
fn reject(record: &[u8]) -> WriterError {
    let _ = io::stderr().lock().write_all(record);
    WriterError::LogClosed
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct Worker {
    target_path: PathBuf,
    /// Computed when the current file was created, not at rotation time.
    pending_backup: PathBuf,
    file: Option<File>,
    policy: Box<dyn RotationPolicy>,
    compress: bool,
    /// Whether the missing-handle condition has been logged since the last
    /// successful open.
    reported_missing: bool,
}

impl Worker {
    fn run(&mut self, records: &Receiver<Vec<u8>>, done: &Receiver<()>, closed: &AtomicBool) {
        loop {
            if closed.load(Ordering::Acquire) {
                break;
            }
            crossbeam::select! {
                recv(records) -> record => match record {
                    Ok(record) => self.write(&record),
                    // Every producer handle is gone.
                    Err(_) => return,
                },
                recv(done) -> _ => break,
            }
        }

        // Records queued before close began are still written.
        while let Ok(record) = records.try_recv() {
            self.write(&record);
        }
    }

    fn write(&mut self, record: &[u8]) {
        if self.policy.shall_rotate() {
            match self.rotate() {
                Ok(()) => self.policy.mark_rotated(),
                Err(err) => tracing::error!(
                    path = %self.target_path.display(),
                    error = %err,
                    "log rotation failed"
                ),
            }
        }

        match self.file.as_mut() {
            Some(file) => {
                if let Err(err) = file.write_all(record) {
                    tracing::error!(path = %self.target_path.display(), error = %err, "log write failed");
                }
            }
            None => {
                if !self.reported_missing {
                    self.reported_missing = true;
                    tracing::error!(
                        path = %self.target_path.display(),
                        "no open log file, dropping records until the next rotation succeeds"
                    );
                }
            }
        }
    }

    /// Rename the live file to the pending backup name and start a fresh one.
    ///
    /// A failed rename leaves the writer without a file; the policy is not
    /// marked, so the next write retries the rotation.
    fn rotate(&mut self) -> Result<(), WriterError> {
        if let Some(file) = self.file.take() {
            if let Err(err) = file.sync_all() {
                tracing::warn!(path = %self.target_path.display(), error = %err, "failed to sync log file before rotation");
            }
        }

        if self.target_path.exists() && !self.pending_backup.as_os_str().is_empty() {
            let backup = self.pending_backup.clone();
            fs::rename(&self.target_path, &backup).map_err(|e| io_err(&self.target_path, e))?;
            self.spawn_housekeeping(backup);
        }

        self.pending_backup = self.policy.backup_name();
        self.file = Some(create_target(&self.target_path)?);
        self.reported_missing = false;
        Ok(())
    }

    fn spawn_housekeeping(&self, backup: PathBuf) {
        let scan = self.policy.outdated_scan();
        let spawned = housekeeping::spawn(backup.clone(), self.compress, scan);
        // Dropping the handle detaches the thread.
        if let Err(err) = spawned {
            tracing::error!(path = %backup.display(), error = %err, "failed to start log housekeeping");
        }
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn open_target(path: &Path) -> Result<File, WriterError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            create_dirs(parent)?;
        }
    }
    file_options()
        .open(path)
        .map_err(|e| io_err(path, e))
}

fn create_target(path: &Path) -> Result<File, WriterError> {
    file_options().open(path).map_err(|e| io_err(path, e))
}

#[cfg(unix)]
fn file_options() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;
    let mut options = OpenOptions::new();
    options.create(true).append(true).mode(0o600);
    options
}

#[cfg(not(unix))]
fn file_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    options
}

#[cfg(unix)]
fn create_dirs(dir: &Path) -> Result<(), WriterError> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(dir)
        .map_err(|e| io_err(dir, e))
}

#[cfg(not(unix))]
fn create_dirs(dir: &Path) -> Result<(), WriterError> {
    fs::create_dir_all(dir).map_err(|e| io_err(dir, e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
