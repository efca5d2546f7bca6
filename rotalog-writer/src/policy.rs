//! Rotation policies: when to rotate, what to call the backup, what to delete.
//!
//! Backup names have the form `<base><delimiter><YYYY-MM-DD>` (plus `.gz`
//! once compressed). Because the date is zero-padded ISO, comparing two
//! backup names of the same base lexicographically compares their dates.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use rotalog_core::SharedClock;

/// Suffix appended to compressed backups.
pub const GZIP_SUFFIX: &str = ".gz";

/// Retention scan detached from its policy, run later on a housekeeping
/// thread.
pub type OutdatedScan = Box<dyn FnOnce() -> Vec<PathBuf> + Send>;

/// Decides rotation timing, backup naming and retention for one writer.
///
/// A policy is owned by the writer's worker thread; none of these methods
/// are called concurrently.
pub trait RotationPolicy: Send + 'static {
    /// Name the live file will be renamed to if it is rotated now.
    fn backup_name(&self) -> PathBuf;

    /// Record that a rotation just succeeded.
    fn mark_rotated(&mut self);

    /// Whether the next write should be preceded by a rotation.
    fn shall_rotate(&self) -> bool;

    /// Backups that fell out of the retention window and may be deleted.
    fn outdated_files(&self) -> Vec<PathBuf>;

    /// Snapshot of the retention settings that computes
    /// [`outdated_files`](RotationPolicy::outdated_files) without borrowing
    /// the policy, so a slow scan never holds up the worker.
    fn outdated_scan(&self) -> OutdatedScan;

    /// Label prepended to every record written through this policy's writer.
    fn prefix(&self) -> &str;
}

/// Rotates once per local calendar day and keeps `retention_days` of backups.
#[derive(Debug, Clone)]
pub struct DailyRotationPolicy {
    base_name: PathBuf,
    prefix: String,
    delimiter: String,
    retention_days: i32,
    compress: bool,
    last_marked_date: String,
    clock: SharedClock,
}

impl DailyRotationPolicy {
    /// New policy marked with today's date, so the first rotation happens at
    /// the next date change.
    pub fn new(
        base_name: impl Into<PathBuf>,
        prefix: impl Into<String>,
        delimiter: impl Into<String>,
        retention_days: i32,
        compress: bool,
        clock: SharedClock,
    ) -> Self {
        let last_marked_date = clock.today();
        Self {
            base_name: base_name.into(),
            prefix: prefix.into(),
            delimiter: delimiter.into(),
            retention_days,
            compress,
            last_marked_date,
            clock,
        }
    }

    /// Clears the mark: [`RotationPolicy::shall_rotate`] stays false until
    /// [`RotationPolicy::mark_rotated`] is called.
    pub fn unmarked(mut self) -> Self {
        self.last_marked_date.clear();
        self
    }

    pub fn base_name(&self) -> &Path {
        &self.base_name
    }

    pub fn last_marked_date(&self) -> &str {
        &self.last_marked_date
    }

    /// `<base><delimiter><date>`
    fn dated_name(&self, date: &str) -> OsString {
        let mut name = self.base_name.clone().into_os_string();
        name.push(&self.delimiter);
        name.push(date);
        name
    }

    /// Glob pattern matching every backup of this base. Metacharacters in the
    /// base path are escaped so only the trailing `*` is a wildcard.
    fn backup_pattern(&self) -> String {
        let base = glob::Pattern::escape(&self.base_name.to_string_lossy());
        let delimiter = glob::Pattern::escape(&self.delimiter);
        if self.compress {
            format!("{base}{delimiter}*{GZIP_SUFFIX}")
        } else {
            format!("{base}{delimiter}*")
        }
    }
}

impl RotationPolicy for DailyRotationPolicy {
    fn backup_name(&self) -> PathBuf {
        PathBuf::from(self.dated_name(&self.clock.today()))
    }

    fn mark_rotated(&mut self) {
        self.last_marked_date = self.clock.today();
    }

    fn shall_rotate(&self) -> bool {
        !self.last_marked_date.is_empty() && self.clock.today() != self.last_marked_date
    }

    fn outdated_files(&self) -> Vec<PathBuf> {
        if self.retention_days <= 0 {
            return Vec::new();
        }

        let pattern = self.backup_pattern();
        let entries = match glob::glob(&pattern) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!(pattern = %pattern, error = %err, "failed to list outdated log files");
                return Vec::new();
            }
        };

        let mut boundary = self.dated_name(&self.clock.days_ago(i64::from(self.retention_days)));
        if self.compress {
            boundary.push(GZIP_SUFFIX);
        }

        let mut outdated: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable log file entry");
                    None
                }
            })
            .filter(|path| path.as_os_str() < boundary.as_os_str())
            .collect();
        outdated.sort();
        outdated
    }

    fn outdated_scan(&self) -> OutdatedScan {
        let snapshot = self.clone();
        Box::new(move || snapshot.outdated_files())
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
