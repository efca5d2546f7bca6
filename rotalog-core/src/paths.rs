use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const ACCESS_LOG: &str = "access.log";
pub const ERROR_LOG: &str = "error.log";
pub const SLOW_LOG: &str = "slow.log";
pub const STAT_LOG: &str = "stat.log";

pub const INFO_PREFIX: &str = "[INFO] ";
pub const ERROR_PREFIX: &str = "[ERROR] ";
pub const SLOW_PREFIX: &str = "[SLOW] ";
pub const STAT_PREFIX: &str = "[STAT] ";
pub const STACK_PREFIX: &str = "[STACK] ";

pub const DEFAULT_HOSTNAME: &str = "rotalog";

/// One of the named log streams a process writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Info,
    Error,
    Slow,
    Stat,
}

impl Stream {
    pub const ALL: [Stream; 4] = [Stream::Info, Stream::Error, Stream::Slow, Stream::Stat];

    pub fn file_name(self) -> &'static str {
        match self {
            Stream::Info => ACCESS_LOG,
            Stream::Error => ERROR_LOG,
            Stream::Slow => SLOW_LOG,
            Stream::Stat => STAT_LOG,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Stream::Info => INFO_PREFIX,
            Stream::Error => ERROR_PREFIX,
            Stream::Slow => SLOW_PREFIX,
            Stream::Stat => STAT_PREFIX,
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Info => write!(f, "info"),
            Stream::Error => write!(f, "error"),
            Stream::Slow => write!(f, "slow"),
            Stream::Stat => write!(f, "stat"),
        }
    }
}

impl FromStr for Stream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Stream::Info),
            "error" => Ok(Stream::Error),
            "slow" => Ok(Stream::Slow),
            "stat" => Ok(Stream::Stat),
            other => Err(format!(
                "unknown stream '{other}'; expected: info, error, slow, stat"
            )),
        }
    }
}

/// `<dir>/<stream file>`
pub fn stream_path(dir: &Path, stream: Stream) -> PathBuf {
    dir.join(stream.file_name())
}

/// `<root>/<namespace>/<hostname>`
pub fn volume_dir(root: &Path, namespace: &str, hostname: &str) -> PathBuf {
    root.join(namespace).join(hostname)
}

/// Host name used in volume mode: `$HOSTNAME`, then `/etc/hostname`,
/// falling back to [`DEFAULT_HOSTNAME`].
pub fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .and_then(|name| sanitize_hostname(&name))
        .unwrap_or_else(|| DEFAULT_HOSTNAME.to_owned())
}

fn sanitize_hostname(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return None;
    }
    Some(name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_parses_case_insensitively() {
        assert_eq!("ERROR".parse::<Stream>(), Ok(Stream::Error));
        assert!("trace".parse::<Stream>().is_err());
    }

    #[test]
    fn stream_paths_use_fixed_file_names() {
        let dir = Path::new("/logs");
        assert_eq!(stream_path(dir, Stream::Info), PathBuf::from("/logs/access.log"));
        assert_eq!(stream_path(dir, Stream::Stat), PathBuf::from("/logs/stat.log"));
    }

    #[test]
    fn hostname_rejects_path_like_values() {
        assert_eq!(sanitize_hostname("  web-1\n"), Some("web-1".to_owned()));
        assert_eq!(sanitize_hostname(""), None);
        assert_eq!(sanitize_hostname("a/b"), None);
        assert_eq!(sanitize_hostname(".."), None);
    }
}
