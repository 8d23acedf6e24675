//! Content-addressed on-disk result cache (spec §4.1).
//!
//! Layout: `<cache_dir>/<scanner>/<domain>.json`, containing either the
//! payload's JSON encoding or the sentinel `{"invalid": true}`.

use crate::scanner::Payload;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// A payload was found and decoded.
    Hit(Payload),
    /// The invalid sentinel was found: spec §4.1 says callers treat this as
    /// "no data" without re-executing, i.e. the payload is set to `Null`.
    Invalid,
    /// No cache entry exists yet.
    Absent,
}

impl CacheLookup {
    /// Applies spec §4.6 step 3: on a hit whose decoded value is the
    /// invalid sentinel, the payload becomes `Null`; on a genuine hit, the
    /// decoded payload is used as-is.
    pub fn into_payload(self) -> Option<Payload> {
        match self {
            CacheLookup::Hit(payload) => Some(payload),
            CacheLookup::Invalid => Some(Value::Null),
            CacheLookup::Absent => None,
        }
    }
}

/// The on-disk result cache.
pub struct ResultCache {
    root: PathBuf,
}

impl ResultCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, domain: &str, scanner: &str) -> PathBuf {
        self.root.join(scanner).join(format!("{domain}.json"))
    }

    /// Reads the cache entry for `(domain, scanner)`. Never invoked by
    /// callers when caching is disabled (spec §4.1: "if `cache` mode is
    /// disabled, reads are skipped but writes always occur").
    pub fn read(&self, domain: &str, scanner: &str) -> std::io::Result<CacheLookup> {
        let path = self.path_for(domain, scanner);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CacheLookup::Absent),
            Err(e) => return Err(e),
        };

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        if is_invalid_sentinel(&value) {
            Ok(CacheLookup::Invalid)
        } else {
            Ok(CacheLookup::Hit(value))
        }
    }

    /// Writes `payload` (or the invalid sentinel, if `payload` is `Null`)
    /// for `(domain, scanner)`, atomically. Always runs, cache-enabled or
    /// not (spec §4.1).
    pub fn write(&self, domain: &str, scanner: &str, payload: &Payload) -> std::io::Result<()> {
        let dir = self.root.join(scanner);
        std::fs::create_dir_all(&dir)?;

        let encoded = if payload.is_null() {
            serde_json::json!({"invalid": true})
        } else {
            payload.clone()
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(serde_json::to_vec(&encoded)?.as_slice())?;
        tmp.flush()?;
        tmp.persist(self.path_for(domain, scanner))
            .map_err(|e| e.error)?;
        Ok(())
    }
}

fn is_invalid_sentinel(value: &Value) -> bool {
    matches!(value.get("invalid"), Some(Value::Bool(true))) && value.as_object().map(|o| o.len()) == Some(1)
}

/// Truncates (removes) every cache-independent result table under
/// `results_dir` matching `<scanner>.csv`, for the scanners about to run.
/// Called by the Run Controller at run start (spec §3 "Result files are
/// truncated at run start"). The cache itself is never truncated here —
/// cache entries persist across runs by design (spec §3: "never deleted by
/// the dispatcher").
pub fn truncate_result_tables(results_dir: &Path, scanner_names: &[&str]) -> std::io::Result<()> {
    std::fs::create_dir_all(results_dir)?;
    for name in scanner_names {
        let path = results_dir.join(format!("{name}.csv"));
        if path.exists() {
            std::fs::remove_file(path)?;
        }
    }
    Ok(())
}
