//! The top-level entry point (spec §4.7): truncates prior results, runs
//! every scanner in order, optionally enriches tables with remote-side
//! detail, and writes the run metadata record.

use crate::cache::{self, ResultCache};
use crate::enricher::{self, LogsClient, NullLogsClient};
use crate::error::ScanResult;
use crate::lifecycle::{self, SharedExecutors};
use crate::local_executor::{HeadlessBridge, LocalExecutor, NullHeadlessBridge};
use crate::meta::RunMetadata;
use crate::options::{RunOptions, REMOTE_TIMEOUT, SETTLE_DELAY};
use crate::remote_executor::RemoteExecutor;
use crate::scanner::Scanner;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Orchestrates a full run. Collaborators that spec.md §1 calls out of
/// scope (headless bridge, remote log service) default to no-op
/// implementations and can be substituted for tests or richer builds.
pub struct RunController {
    headless: Arc<dyn HeadlessBridge>,
    logs: Arc<dyn LogsClient>,
}

impl Default for RunController {
    fn default() -> Self {
        Self {
            headless: Arc::new(NullHeadlessBridge),
            logs: Arc::new(NullLogsClient),
        }
    }
}

impl RunController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_headless_bridge(mut self, bridge: Arc<dyn HeadlessBridge>) -> Self {
        self.headless = bridge;
        self
    }

    pub fn with_logs_client(mut self, logs: Arc<dyn LogsClient>) -> Self {
        self.logs = logs;
        self
    }

    /// A domain list plus an ordered, named scanner set plus options: see
    /// [`crate::options::RunRequest`].
    pub async fn run(
        &self,
        domains: &[String],
        scanners: &[Arc<dyn Scanner>],
        opts: &RunOptions,
        command: String,
    ) -> ScanResult<RunMetadata> {
        let scanner_names: Vec<&str> = scanners.iter().map(|s| s.name()).collect();
        cache::truncate_result_tables(&opts.results_dir, &scanner_names)?;

        let scan_uuid = Uuid::new_v4();
        let result_cache = ResultCache::new(&opts.cache_dir);

        let local = LocalExecutor::new(self.headless.as_ref());
        let remote_client = reqwest::Client::builder()
            .timeout(REMOTE_TIMEOUT)
            .build()
            .map_err(|e| crate::error::ScanError::Configuration(format!("{e}")))?;
        let remote = RemoteExecutor::new(remote_client, opts.remote_base_url.clone());
        let executors = SharedExecutors {
            local: &local,
            remote: Some(&remote),
        };

        let run_start = Utc::now();
        let mut durations = HashMap::new();
        let mut used_remote = false;

        for scanner in scanners {
            let scanner_uses_remote = opts.use_lambda_for(scanner.name(), scanner.use_lambda());
            used_remote |= scanner_uses_remote;

            let duration = lifecycle::run_scanner(
                scanner.as_ref(),
                domains,
                scan_uuid,
                opts,
                Some(&result_cache),
                &executors,
            )
            .await?;
            durations.insert(scanner.name().to_string(), duration);
        }

        if used_remote && opts.lambda_details {
            tokio::time::sleep(SETTLE_DELAY).await;
            for name in &scanner_names {
                let path = opts.results_dir.join(format!("{name}.csv"));
                if let Err(e) = enricher::enrich_table(&path, self.logs.as_ref()).await {
                    tracing::warn!(scanner = *name, "post-run enrichment failed: {e}");
                }
            }
        }

        let run_end = Utc::now();
        let metadata = RunMetadata {
            start_time: run_start,
            end_time: run_end,
            duration: (run_end - run_start).num_milliseconds() as f64 / 1000.0,
            durations,
            command,
            scan_uuid,
        };

        let meta_path = opts.results_dir.join("meta.json");
        let file = std::fs::File::create(&meta_path)?;
        serde_json::to_writer_pretty(file, &metadata)?;

        Ok(metadata)
    }
}
