//! Byte counters from the tunnel server's status file
//!
//! The file is rewritten by the tunnel server while we read it, so every
//! failure here is a stale read: the caller falls back to zero counters and
//! the next tick tries again.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::warn;

/// Marks the end of the client list section
const SECTION_END: &str = "ROUTING TABLE";

/// Cumulative `(bytes_in, bytes_out)` for a status-file key
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn lookup(&self, key: &str) -> Option<(u64, u64)>;
}

/// Reads counters from a status file on disk
#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StatusFile { path: path.into() }
    }
}

#[async_trait]
impl StatusSource for StatusFile {
    async fn lookup(&self, key: &str) -> Option<(u64, u64)> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => parse_counters(&contents, key),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot read status file");
                None
            }
        }
    }
}

/// Find `key` in the client list and return its two counters
///
/// A line matches when it starts with `key` followed by a comma; the next
/// two fields are the received and sent byte counts.
pub fn parse_counters(contents: &str, key: &str) -> Option<(u64, u64)> {
    let line = contents
        .lines()
        .take_while(|line| !line.starts_with(SECTION_END))
        .find_map(|line| line.strip_prefix(key)?.strip_prefix(','))?;

    let mut fields = line.split(',');
    let bytes_in = fields.next()?.trim().parse().ok()?;
    let bytes_out = fields.next()?.trim().parse().ok()?;
    Some((bytes_in, bytes_out))
}
