//! Synchronous remote function invocation (spec §4.4).
//!
//! Each attempt POSTs `{domain, options, scanner, environment}` to
//! `{base_url}/task_<scanner_name>` and classifies the response against the
//! grammar in spec §4.4 before deciding whether to retry.

use crate::environment::Environment;
use crate::error::{ScanError, ScanResult};
use crate::meta::LambdaMeta;
use crate::scanner::Payload;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct RemoteRequest<'a> {
    domain: &'a str,
    options: &'a Value,
    scanner: &'a str,
    environment: &'a Environment,
}

/// The classified shape of one response body (spec §4.4's grammar),
/// separated from transport concerns so it can be unit-tested directly.
#[derive(Debug, PartialEq)]
pub enum RemoteOutcome {
    /// `{errorMessage: ...}` — remote platform-level error; retriable.
    PlatformError(String),
    /// `{lambda, data, error?}` — success or scanner-level error.
    Scanner {
        lambda: Option<LambdaMeta>,
        data: Option<Value>,
        error: Option<String>,
    },
    /// `null` or an empty body; retriable.
    Empty,
}

/// Classifies a decoded response body (or `Value::Null` for an empty body).
pub fn classify(raw: &Value) -> RemoteOutcome {
    if raw.is_null() {
        return RemoteOutcome::Empty;
    }
    if let Some(message) = raw.get("errorMessage").and_then(Value::as_str) {
        return RemoteOutcome::PlatformError(message.to_string());
    }
    let lambda = raw
        .get("lambda")
        .cloned()
        .and_then(|v| serde_json::from_value::<LambdaMeta>(v).ok());
    let data = raw.get("data").cloned();
    let error = raw.get("error").and_then(Value::as_str).map(str::to_string);
    RemoteOutcome::Scanner { lambda, data, error }
}

/// Invokes a named remote function synchronously, with bounded retries.
pub struct RemoteExecutor {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteExecutor {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, scanner_name: &str) -> String {
        format!("{}/task_{scanner_name}", self.base_url.trim_end_matches('/'))
    }

    /// Runs one scan with up to `max_retries` reattempts, recording the
    /// retry count and remote execution detail into `meta`, and appending
    /// one formatted string per retriable failure into `errors` (these end
    /// up in the row's `Local Errors` cell, spec §7 scenario 3).
    ///
    /// Returns the most recently, successfully decoded `data` on retry
    /// exhaustion (spec §4.4), which may be `Value::Null`.
    pub async fn run(
        &self,
        scanner_name: &str,
        domain: &str,
        env: &Environment,
        options: &Value,
        max_retries: u32,
        meta: &mut LambdaMeta,
        errors: &mut Vec<String>,
    ) -> ScanResult<Payload> {
        let wire_env = env.clone().without_fast_cache();
        let url = self.endpoint(scanner_name);
        let mut last_data: Option<Value> = None;
        let mut last_error: Option<String> = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                meta.retries = attempt;
            }

            let body = RemoteRequest {
                domain,
                options,
                scanner: scanner_name,
                environment: &wire_env,
            };

            let raw = match self.client.post(&url).json(&body).send().await {
                Ok(response) => match response.text().await {
                    Ok(text) if text.trim().is_empty() => Value::Null,
                    Ok(text) => serde_json::from_str(&text).unwrap_or(Value::Null),
                    Err(_) => Value::Null,
                },
                Err(e) if e.is_timeout() => Value::Null,
                Err(e) => {
                    last_error = Some(e.to_string());
                    errors.push(last_error.clone().unwrap());
                    continue;
                }
            };

            match classify(&raw) {
                RemoteOutcome::PlatformError(message) => {
                    errors.push(message.clone());
                    last_error = Some(message);
                }
                RemoteOutcome::Empty => {
                    let message = "empty or malformed remote response".to_string();
                    errors.push(message.clone());
                    last_error = Some(message);
                }
                RemoteOutcome::Scanner { lambda, data, error } => {
                    if let Some(incoming) = lambda {
                        merge_lambda(meta, incoming);
                    }
                    if let Some(request_id) = &meta.request_id {
                        tracing::debug!(scanner = scanner_name, domain, request_id, attempt, "remote attempt");
                    }
                    match (data, error) {
                        (Some(data), None) => {
                            last_data = Some(data.clone());
                            return Ok(data);
                        }
                        (data, error) => {
                            if let Some(data) = data {
                                last_data = Some(data);
                            }
                            let message = error.unwrap_or_else(|| "remote response missing data".to_string());
                            errors.push(message.clone());
                            last_error = Some(message);
                        }
                    }
                }
            }
        }

        if let Some(data) = last_data {
            return Ok(data);
        }

        Err(ScanError::Remote(
            last_error.unwrap_or_else(|| "remote invocation exhausted retries".to_string()),
        ))
    }
}

fn merge_lambda(meta: &mut LambdaMeta, incoming: LambdaMeta) {
    meta.request_id = incoming.request_id.or_else(|| meta.request_id.take());
    meta.log_group_name = incoming.log_group_name.or_else(|| meta.log_group_name.take());
    meta.log_stream_name = incoming.log_stream_name.or_else(|| meta.log_stream_name.take());
    meta.start_time = incoming.start_time.or(meta.start_time);
    meta.end_time = incoming.end_time.or(meta.end_time);
    meta.memory_limit = incoming.memory_limit.or(meta.memory_limit);
    meta.measured_duration = incoming.measured_duration.or(meta.measured_duration);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::ScanMethod;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn classifies_platform_error() {
        let raw = json!({"errorMessage": "timed out"});
        assert_eq!(classify(&raw), RemoteOutcome::PlatformError("timed out".to_string()));
    }

    #[test]
    fn classifies_empty_body() {
        assert_eq!(classify(&Value::Null), RemoteOutcome::Empty);
    }

    #[test]
    fn classifies_scanner_success() {
        let raw = json!({"lambda": {"retries": 0, "request_id": "abc"}, "data": {"v": 1}});
        match classify(&raw) {
            RemoteOutcome::Scanner { data, error, lambda } => {
                assert_eq!(data, Some(json!({"v": 1})));
                assert_eq!(error, None);
                assert_eq!(lambda.unwrap().request_id, Some("abc".to_string()));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    fn env() -> Environment {
        Environment::new(ScanMethod::Remote, Uuid::nil(), 1)
    }

    #[tokio::test]
    async fn retries_platform_errors_then_succeeds_and_records_retry_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/task_flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errorMessage": "x"})))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/task_flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"lambda": {"retries": 0, "request_id": "r3"}, "data": {"v": 1}}),
            ))
            .mount(&server)
            .await;

        let executor = RemoteExecutor::new(reqwest::Client::new(), server.uri());
        let mut meta = LambdaMeta::default();
        let mut errors = Vec::new();
        let result = executor
            .run("flaky", "example.com", &env(), &Value::Null, 2, &mut meta, &mut errors)
            .await
            .unwrap();

        assert_eq!(result, json!({"v": 1}));
        assert_eq!(meta.retries, 2);
        assert_eq!(meta.request_id, Some("r3".to_string()));
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn exhausting_retries_with_zero_budget_returns_error_and_bounds_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/task_broken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errorMessage": "x"})))
            .mount(&server)
            .await;

        let executor = RemoteExecutor::new(reqwest::Client::new(), server.uri());
        let mut meta = LambdaMeta::default();
        let mut errors = Vec::new();
        let result = executor
            .run("broken", "example.com", &env(), &Value::Null, 0, &mut meta, &mut errors)
            .await;

        assert!(result.is_err());
        assert_eq!(meta.retries, 0);
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn the_fast_cache_key_never_reaches_the_wire() {
        use std::sync::Arc;

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/task_noop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"lambda": {"retries": 0}, "data": {"ok": true}}),
            ))
            .mount(&server)
            .await;

        let mut e = env();
        e.fast_cache = Some(Arc::new(json!({"huge": "table"})));

        let executor = RemoteExecutor::new(reqwest::Client::new(), server.uri());
        let mut meta = LambdaMeta::default();
        let mut errors = Vec::new();
        executor
            .run("noop", "example.com", &e, &Value::Null, 0, &mut meta, &mut errors)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["environment"].get("fast_cache"), None);
    }
}
