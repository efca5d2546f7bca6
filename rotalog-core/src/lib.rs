//! rotalog core library — configuration, paths, clock, line formatting, errors.
//!
//! Public API surface:
//! - [`config`] — [`LogConfig`] and YAML loading / validation
//! - [`error`] — [`ConfigError`]
//! - [`paths`] — stream file names, prefixes, directory derivation
//! - [`clock`] — [`Clock`] abstraction with system and manual implementations
//! - [`format`] — timestamp / caller decoration of log lines

pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod paths;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{LogConfig, LogMode};
pub use error::ConfigError;
pub use paths::Stream;
