//! rotalog writer — rotating log files, housekeeping, rate-limited reporting.

mod error;
pub mod global;
pub mod housekeeping;
pub mod limiter;
pub mod policy;
pub mod sink;
pub mod streams;
pub mod writer;

pub use error::WriterError;
pub use limiter::RateLimitedSink;
pub use policy::{DailyRotationPolicy, OutdatedScan, RotationPolicy, GZIP_SUFFIX};
pub use sink::{ConsoleSink, ConsoleTarget, LogSink};
pub use streams::{prune, stream_paths, LogStreams};
pub use writer::{RotatingWriter, WriterOptions};
