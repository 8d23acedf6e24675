//! Post-run remote enrichment (spec §4.8): rewrites each scanner's table in
//! place, appending reported duration, log delay, memory used, and a
//! per-row fetch error column sourced from the remote log service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

/// One log event returned by the remote log service (spec §6 "Remote log
/// service contract"): an ingestion timestamp plus a tab-separated
/// `key:value` message body.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub ingestion_time_ms: i64,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum EnrichError {
    RateLimited,
    Other(String),
}

impl std::fmt::Display for EnrichError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrichError::RateLimited => write!(f, "too many requests"),
            EnrichError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// The remote log service collaborator (spec §1: out of scope, interface
/// only). Queried by `(log_group_name, log_stream_name, filter_pattern)`.
#[async_trait]
pub trait LogsClient: Send + Sync {
    async fn query(
        &self,
        log_group_name: &str,
        log_stream_name: Option<&str>,
        filter_pattern: &str,
    ) -> Result<Vec<LogEvent>, EnrichError>;
}

/// Default client used when no real log-service integration is wired in;
/// always reports "no logs found" rather than fabricating measurements.
pub struct NullLogsClient;

#[async_trait]
impl LogsClient for NullLogsClient {
    async fn query(
        &self,
        _log_group_name: &str,
        _log_stream_name: Option<&str>,
        _filter_pattern: &str,
    ) -> Result<Vec<LogEvent>, EnrichError> {
        Ok(Vec::new())
    }
}

const TERMINATOR: &str = "Max Memory Used";
const APPENDED_HEADERS: [&str; 4] = [
    "Reported Duration",
    "Log Delay",
    "Memory Used",
    "Fetching Errors",
];

/// Rewrites the table at `path` in place, appending [`APPENDED_HEADERS`] to
/// every row. A no-op if the table has no remote columns (local-only run)
/// or does not exist (scanner produced no table).
pub async fn enrich_table(path: &Path, logs: &dyn LogsClient) -> crate::error::ScanResult<()> {
    if !path.exists() {
        return Ok(());
    }

    let mut reader = csv::Reader::from_path(path)?;
    let header: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();

    let request_id_idx = header.iter().position(|h| h == "Request ID");
    let log_group_idx = header.iter().position(|h| h == "Log Group Name");
    let log_stream_idx = header.iter().position(|h| h == "Log Stream Name");
    let end_time_idx = header.iter().position(|h| h == "End Time");

    let (Some(request_id_idx), Some(log_group_idx), Some(log_stream_idx), Some(end_time_idx)) =
        (request_id_idx, log_group_idx, log_stream_idx, end_time_idx)
    else {
        return Ok(());
    };

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    let mut new_header = header;
    new_header.extend(APPENDED_HEADERS.iter().map(|s| s.to_string()));

    let mut augmented = Vec::with_capacity(rows.len());
    for row in rows {
        let request_id = row.get(request_id_idx).cloned().unwrap_or_default();
        let log_group = row.get(log_group_idx).cloned().unwrap_or_default();
        let log_stream = row.get(log_stream_idx).cloned().unwrap_or_default();
        let end_time = row.get(end_time_idx).cloned().unwrap_or_default();

        let (duration, delay, memory, error) =
            enrich_row(logs, &log_group, &log_stream, &request_id, &end_time).await;

        let mut new_row = row;
        new_row.push(duration);
        new_row.push(delay);
        new_row.push(memory);
        new_row.push(error);
        augmented.push(new_row);
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(&mut tmp);
        writer.write_record(&new_header)?;
        for row in &augmented {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

async fn enrich_row(
    logs: &dyn LogsClient,
    log_group: &str,
    log_stream: &str,
    request_id: &str,
    local_end_time: &str,
) -> (String, String, String, String) {
    if request_id.is_empty() {
        return (
            String::new(),
            String::new(),
            String::new(),
            "No logs found for this task.".to_string(),
        );
    }

    let filter_pattern = format!("{request_id} {TERMINATOR}");
    let stream = (!log_stream.is_empty()).then_some(log_stream);

    match logs.query(log_group, stream, &filter_pattern).await {
        Ok(events) => match events.iter().rev().find(|e| e.message.contains(TERMINATOR)) {
            Some(event) => {
                let fields: Vec<&str> = event.message.split('\t').collect();
                let duration = fields.get(1).map(|kv| value_of(kv)).unwrap_or_default();
                let memory = fields.get(4).map(|kv| value_of(kv)).unwrap_or_default();
                let delay = log_delay(event.ingestion_time_ms, local_end_time);
                (duration, delay, memory, String::new())
            }
            None => (
                String::new(),
                String::new(),
                String::new(),
                "No logs found for this task.".to_string(),
            ),
        },
        Err(e @ EnrichError::RateLimited) => {
            (String::new(), String::new(), String::new(), e.to_string())
        }
        Err(e) => (String::new(), String::new(), String::new(), e.to_string()),
    }
}

fn value_of(kv: &str) -> String {
    kv.split_once(':')
        .map(|(_, v)| v.trim().to_string())
        .unwrap_or_default()
}

fn log_delay(ingestion_time_ms: i64, local_end_time: &str) -> String {
    let Ok(local_end) = DateTime::parse_from_rfc3339(local_end_time) else {
        return String::new();
    };
    let local_end: DateTime<Utc> = local_end.with_timezone(&Utc);
    let Some(ingestion) = DateTime::<Utc>::from_timestamp_millis(ingestion_time_ms) else {
        return String::new();
    };
    (ingestion - local_end).num_milliseconds().to_string()
}
