//! Log configuration loaded from YAML.
//!
//! ```yaml
//! mode: volume          # regular | console | volume
//! namespace: billing    # required in volume mode
//! path: /var/log/app
//! compress: true
//! keep_days: 7
//! stack_cooldown_millis: 100
//! ```
//!
//! Every field is optional; missing fields take the [`Default`] values.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

/// Default backup-name delimiter: `access.log-2024-05-01`.
pub const DEFAULT_DELIMITER: &str = "-";

/// Default bounded-queue capacity per writer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default cooldown of the stack reporter.
pub const DEFAULT_STACK_COOLDOWN_MILLIS: i64 = 100;

/// Where log streams end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    /// Rotating files directly under `path`.
    #[default]
    Regular,
    /// No files; info/slow/stat go to stdout, errors to stderr.
    Console,
    /// Rotating files under `path/<namespace>/<hostname>`.
    Volume,
}

impl fmt::Display for LogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogMode::Regular => write!(f, "regular"),
            LogMode::Console => write!(f, "console"),
            LogMode::Volume => write!(f, "volume"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub mode: LogMode,
    pub path: PathBuf,
    pub compress: bool,
    /// Retention in days; `<= 0` keeps backups forever.
    pub keep_days: i32,
    /// Cooldown of the stack reporter; `<= 0` disables throttling.
    pub stack_cooldown_millis: i64,
    /// Mirror every file record to stdout.
    pub stdout: bool,
    pub queue_capacity: usize,
    pub delimiter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            mode: LogMode::Regular,
            path: PathBuf::from("logs"),
            compress: false,
            keep_days: 0,
            stack_cooldown_millis: DEFAULT_STACK_COOLDOWN_MILLIS,
            stdout: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            delimiter: DEFAULT_DELIMITER.to_owned(),
        }
    }
}

impl LogConfig {
    /// Load and validate a config file.
    ///
    /// Returns `ConfigError::Io` if the file cannot be read and
    /// `ConfigError::Parse` (with path + line context) if the YAML is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: LogConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate an in-memory YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: LogConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode != LogMode::Console && self.path.as_os_str().is_empty() {
            return Err(ConfigError::PathNotSet);
        }
        if self.mode == LogMode::Volume && self.namespace().is_none() {
            return Err(ConfigError::NamespaceNotSet);
        }
        if self.delimiter.is_empty() || self.delimiter.contains(['/', '\\']) {
            return Err(ConfigError::InvalidDelimiter(self.delimiter.clone()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }

    /// Non-empty namespace, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// Directory that holds the stream files for this config.
    ///
    /// Volume mode appends `<namespace>/<hostname>` to `path`.
    pub fn resolved_dir(&self) -> Result<PathBuf, ConfigError> {
        match self.mode {
            LogMode::Volume => {
                let namespace = self.namespace().ok_or(ConfigError::NamespaceNotSet)?;
                Ok(paths::volume_dir(&self.path, namespace, &paths::hostname()))
            }
            LogMode::Regular | LogMode::Console => Ok(self.path.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
