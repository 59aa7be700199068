//! Persistent record of the upstream release catalog.
//!
//! One JSON document holds the accepted version list plus the ETag and
//! Last-Modified validators from the response it came from. The record is
//! replaced wholesale after a full fetch and only "touched" (timestamp
//! refreshed) when upstream answers 304 Not Modified.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Epoch seconds of the last successful write or revalidation.
    pub timestamp: u64,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    pub versions: Vec<String>,
}

impl CacheRecord {
    pub fn new(versions: Vec<String>, etag: Option<String>, last_modified: Option<String>) -> Self {
        Self {
            timestamp: now_secs(),
            etag,
            last_modified,
            versions,
        }
    }

    pub fn has_validators(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }
}

/// Current time as epoch seconds.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// A record is usable iff it has versions and is younger than `ttl_secs`.
/// A TTL of zero or less disables the cache entirely, and a timestamp in the
/// future (clock skew, hand-edited file) never counts as fresh.
pub fn is_valid(record: &CacheRecord, ttl_secs: i64, now: u64) -> bool {
    if ttl_secs <= 0 || record.timestamp == 0 || record.versions.is_empty() {
        return false;
    }
    if record.timestamp > now {
        return false;
    }
    now - record.timestamp < ttl_secs as u64
}

#[derive(Debug, Clone)]
pub struct VersionCache {
    path: PathBuf,
}

impl VersionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record. Missing, unreadable or malformed files (including a
    /// record without `timestamp` or `versions`) count as absent.
    pub fn load(&self) -> Option<CacheRecord> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "cannot read version cache: {}", e);
                return None;
            }
        };
        match serde_json::from_slice::<CacheRecord>(&bytes) {
            Ok(record) if !record.versions.is_empty() => Some(record),
            Ok(_) => {
                tracing::debug!(path = %self.path.display(), "version cache has no versions; ignoring");
                None
            }
            Err(e) => {
                tracing::debug!(path = %self.path.display(), "corrupt version cache ignored: {}", e);
                None
            }
        }
    }

    /// Replace the record on disk. Writes a sibling temp file and renames it over
    /// the target so readers never see a half-written document.
    pub fn store(&self, record: &CacheRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)
    }

    /// Refresh only the timestamp of the stored record, keeping versions and
    /// validators. Returns the touched record, or None if there was none.
    pub fn touch(&self, now: u64) -> io::Result<Option<CacheRecord>> {
        let Some(mut record) = self.load() else {
            return Ok(None);
        };
        record.timestamp = record.timestamp.max(now);
        self.store(&record)?;
        Ok(Some(record))
    }
}
