//! Per-attempt diagnostic records (spec §3 "Meta Record", "Run Metadata").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Remote-execution detail merged from the `lambda` sub-object of a remote
/// response envelope, plus the retry counter the executor maintains itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LambdaMeta {
    pub retries: u32,
    pub request_id: Option<String>,
    pub log_group_name: Option<String>,
    pub log_stream_name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub memory_limit: Option<u64>,
    pub measured_duration: Option<f64>,
}

/// Diagnostic record for one (domain, scanner) attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    pub errors: Vec<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub lambda: Option<LambdaMeta>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps `start_time` to now; used right before executor dispatch.
    pub fn mark_start(&mut self) {
        self.start_time = Some(Utc::now());
    }

    /// Stamps `end_time` to now and derives `duration` from `start_time`.
    pub fn mark_end(&mut self) {
        let end = Utc::now();
        if let Some(start) = self.start_time {
            self.duration = Some((end - start).as_seconds_f64());
        }
        self.end_time = Some(end);
    }
}

/// Per-scanner duration bracket recorded by the Run Controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDuration {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration: f64,
}

/// The `meta.json` record written once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: f64,
    pub durations: std::collections::HashMap<String, ScannerDuration>,
    pub command: String,
    pub scan_uuid: Uuid,
}

trait DurationExt {
    fn as_seconds_f64(&self) -> f64;
}

impl DurationExt for chrono::Duration {
    fn as_seconds_f64(&self) -> f64 {
        self.num_microseconds()
            .map(|us| us as f64 / 1_000_000.0)
            .unwrap_or_else(|| self.num_milliseconds() as f64 / 1_000.0)
    }
}
