use std::io::{self, Write};

use crate::error::{io_err, WriterError};

/// A byte sink with an explicit close, so the orchestrator can treat file and
/// console streams alike.
pub trait LogSink: Send + Sync {
    /// Append one record. Returns the number of bytes accepted.
    fn write(&self, data: &[u8]) -> Result<usize, WriterError>;

    fn close(&self) -> Result<(), WriterError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

/// Writes prefixed records straight to stdout or stderr. Closing is a no-op.
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    target: ConsoleTarget,
    prefix: String,
}

impl ConsoleSink {
    pub fn new(target: ConsoleTarget, prefix: impl Into<String>) -> Self {
        Self {
            target,
            prefix: prefix.into(),
        }
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }
}

impl LogSink for ConsoleSink {
    fn write(&self, data: &[u8]) -> Result<usize, WriterError> {
        let mut record = Vec::with_capacity(self.prefix.len() + data.len());
        record.extend_from_slice(self.prefix.as_bytes());
        record.extend_from_slice(data);

        let result = match self.target {
            ConsoleTarget::Stdout => io::stdout().lock().write_all(&record),
            ConsoleTarget::Stderr => io::stderr().lock().write_all(&record),
        };
        result.map_err(|e| io_err(format!("<{:?}>", self.target).to_lowercase(), e))?;
        Ok(record.len())
    }

    fn close(&self) -> Result<(), WriterError> {
        Ok(())
    }
}
