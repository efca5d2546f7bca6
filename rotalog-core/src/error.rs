//! Error types for rotalog-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading or validating a [`crate::LogConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse log config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML parse error for in-memory input.
    #[error("failed to parse log config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("log path must be set")]
    PathNotSet,

    #[error("log namespace must be set in volume mode")]
    NamespaceNotSet,

    /// The backup delimiter is empty or would escape the log directory.
    #[error("invalid backup delimiter {0:?}")]
    InvalidDelimiter(String),

    #[error("queue capacity must be at least 1")]
    ZeroQueueCapacity,
}
