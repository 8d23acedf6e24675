//! Example `Scanner` implementations.
//!
//! Stand-ins for the out-of-scope "real" probes (TLS inspection, HTTP
//! hardening, mail posture, HTML/accessibility — spec §1) named in spec.md
//! §1; used by the integration test suite and registered by the CLI as a
//! minimal built-in scanner set.

use crate::environment::Environment;
use crate::error::ScanResult;
use crate::options::RunOptions;
use crate::scanner::{Payload, Scanner};
use async_trait::async_trait;
use serde_json::json;

/// Always succeeds with a constant payload. Exercises the plain local-scan
/// path (spec §8 scenario 1).
pub struct NoopScanner;

#[async_trait]
impl Scanner for NoopScanner {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn headers(&self) -> Vec<String> {
        vec!["OK".to_string()]
    }

    fn to_rows(&self, payload: &Payload) -> Vec<Vec<String>> {
        if payload.get("ok").and_then(serde_json::Value::as_bool) == Some(true) {
            vec![vec!["True".to_string()]]
        } else {
            vec![]
        }
    }

    async fn scan(&self, _domain: &str, _env: &Environment, _opts: &RunOptions) -> ScanResult<Payload> {
        Ok(json!({"ok": true}))
    }
}

/// Always returns `Value::Null`. Exercises the invalid-sentinel cache path
/// and the `"Scan returned nothing."` error (spec §8 scenario 6).
pub struct NullPayloadScanner;

#[async_trait]
impl Scanner for NullPayloadScanner {
    fn name(&self) -> &'static str {
        "null_scanner"
    }

    fn headers(&self) -> Vec<String> {
        vec!["OK".to_string()]
    }

    fn to_rows(&self, _payload: &Payload) -> Vec<Vec<String>> {
        vec![]
    }
}

/// Declares `use_lambda() == Some(true)`, routing every domain through the
/// Remote Executor regardless of the run-wide default. Used by integration
/// tests that mock the remote endpoint's flaky-then-success behavior
/// (spec §8 scenario 3).
pub struct FlakyRemoteScanner;

#[async_trait]
impl Scanner for FlakyRemoteScanner {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn headers(&self) -> Vec<String> {
        vec!["Value".to_string()]
    }

    fn to_rows(&self, payload: &Payload) -> Vec<Vec<String>> {
        match payload.get("v") {
            Some(v) => vec![vec![v.to_string()]],
            None => vec![],
        }
    }

    fn use_lambda(&self) -> Option<bool> {
        Some(true)
    }
}
