//! Post-rotation housekeeping: gzip the rotated file, delete stale backups.
//!
//! Runs on a detached thread per rotation so the writer's worker never waits
//! on compression or deletion. Every failure is logged here and goes no
//! further; a panic is caught at the thread boundary and logged as well.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{io_err, WriterError};
use crate::policy::GZIP_SUFFIX;

/// Spawn housekeeping for `rotated`.
///
/// `outdated` is evaluated on the housekeeping thread, after compression, so
/// a freshly written `.gz` is seen by the retention scan.
pub fn spawn<F>(rotated: PathBuf, compress: bool, outdated: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() -> Vec<PathBuf> + Send + 'static,
{
    thread::Builder::new()
        .name("rotalog-housekeeping".to_owned())
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                if compress {
                    compress_logged(&rotated);
                }
                delete_files(&outdated());
            }));
            if let Err(payload) = result {
                tracing::error!(
                    path = %rotated.display(),
                    panic = %panic_message(payload.as_ref()),
                    "log housekeeping panicked"
                );
            }
        })
}

fn compress_logged(file: &Path) {
    let started = Instant::now();
    tracing::info!(path = %file.display(), "compressing log file");
    match gzip_file(file) {
        Ok(gz) => tracing::info!(
            path = %gz.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "compressed log file"
        ),
        Err(err) => tracing::error!(path = %file.display(), error = %err, "log compression failed"),
    }
}

/// Compress `file` to `<file>.gz` and remove `file`.
///
/// The source is removed only after the encoder finished and the output was
/// flushed; on any earlier failure the partial `.gz` is removed and the source
/// is left in place.
pub fn gzip_file(file: &Path) -> Result<PathBuf, WriterError> {
    let mut gz_name = file.as_os_str().to_owned();
    gz_name.push(GZIP_SUFFIX);
    let gz_path = PathBuf::from(gz_name);

    if let Err(err) = encode(file, &gz_path) {
        if let Err(cleanup) = fs::remove_file(&gz_path) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %gz_path.display(), error = %cleanup, "failed to remove partial archive");
            }
        }
        return Err(err);
    }

    fs::remove_file(file).map_err(|e| io_err(file, e))?;
    Ok(gz_path)
}

fn encode(src: &Path, dst: &Path) -> Result<(), WriterError> {
    let input = File::open(src).map_err(|e| io_err(src, e))?;
    let output = File::create(dst).map_err(|e| io_err(dst, e))?;

    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
    io::copy(&mut BufReader::new(input), &mut encoder).map_err(|e| io_err(src, e))?;
    let mut writer = encoder.finish().map_err(|e| io_err(dst, e))?;
    writer.flush().map_err(|e| io_err(dst, e))?;
    let file = writer.into_inner().map_err(|e| io_err(dst, e.into_error()))?;
    file.sync_all().map_err(|e| io_err(dst, e))
}

/// Remove every path in `files`. Failures are logged per file and do not stop
/// the batch. Returns the paths actually removed.
pub fn delete_files(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = Vec::with_capacity(files.len());
    for file in files {
        match fs::remove_file(file) {
            Ok(()) => {
                tracing::info!(path = %file.display(), "removed outdated log file");
                removed.push(file.clone());
            }
            Err(err) => {
                tracing::warn!(path = %file.display(), error = %err, "failed to remove outdated log file")
            }
        }
    }
    removed
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
