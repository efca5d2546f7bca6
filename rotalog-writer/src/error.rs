use std::path::PathBuf;

use thiserror::Error;

/// Error surface for writers, housekeeping and the stream orchestrator.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log file closed")]
    LogClosed,

    #[error("log not initialized")]
    NotInitialized,

    #[error("config error: {0}")]
    Config(#[from] rotalog_core::ConfigError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WriterError {
    WriterError::Io {
        path: path.into(),
        source,
    }
}
