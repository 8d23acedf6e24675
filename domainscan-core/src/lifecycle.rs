//! Fans out one scanner's domain set over a bounded worker pool (spec §4.5).
//!
//! Mirrors the teacher's `Scanner<F>::execute_tasks` shape — a `Semaphore`
//! gates concurrency while every domain's future is driven concurrently —
//! but bounds async domain tasks instead of TCP connect attempts, and
//! without needing `'static`-bound spawns since nothing here crosses a
//! `tokio::spawn` boundary.

use crate::cache::ResultCache;
use crate::domain_task::{self, DomainTaskCtx};
use crate::environment::{Environment, ScanMethod};
use crate::error::{ScanError, ScanResult};
use crate::local_executor::LocalExecutor;
use crate::meta::ScannerDuration;
use crate::options::RunOptions;
use crate::remote_executor::RemoteExecutor;
use crate::row_writer::RowWriter;
use crate::scanner::{InitOutcome, Scanner};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Collaborators shared across every scanner in a run (spec §4.4: "one
/// invoke client, one logs client" provided by the Run Controller).
pub struct SharedExecutors<'a> {
    pub local: &'a LocalExecutor<'a>,
    pub remote: Option<&'a RemoteExecutor>,
}

/// Runs one scanner's full lifecycle — init, bounded domain fan-out,
/// finalize — and returns the bracketing duration for `RunMetadata`.
pub async fn run_scanner(
    scanner: &dyn Scanner,
    domains: &[String],
    scan_uuid: Uuid,
    opts: &RunOptions,
    cache: Option<&ResultCache>,
    executors: &SharedExecutors<'_>,
) -> ScanResult<ScannerDuration> {
    let start = Utc::now();

    let use_remote = opts.use_lambda_for(scanner.name(), scanner.use_lambda());
    let workers = opts.workers_for(scanner.name(), scanner.worker_override());

    let writer = RowWriter::open(
        &opts.results_dir,
        scanner.name(),
        &scanner.headers(),
        opts.meta,
        use_remote,
        opts.sort,
    )?;

    let mut env = Environment::new(
        if use_remote {
            ScanMethod::Remote
        } else {
            ScanMethod::Local
        },
        scan_uuid,
        workers,
    );

    match scanner.init(&env, opts).await? {
        InitOutcome::Abort => return Err(ScanError::Aborted(scanner.name().to_string())),
        InitOutcome::Continue(delta) => env.merge(delta),
    }

    let semaphore = Semaphore::new(workers.max(1));
    let selected = filter_by_suffix(domains, opts.suffix.as_deref());

    let tasks = FuturesUnordered::new();
    for domain in &selected {
        tasks.push(async {
            let _permit = semaphore
                .acquire()
                .await
                .expect("semaphore is never closed during a run");
            let ctx = DomainTaskCtx {
                scanner,
                base_env: &env,
                opts,
                cache,
                writer: &writer,
                local: executors.local,
                remote: executors.remote,
                use_remote,
            };
            if let Err(e) = domain_task::run(ctx, domain).await {
                tracing::error!(
                    scanner = scanner.name(),
                    domain = domain.as_str(),
                    "row emission failed: {e}"
                );
            }
        });
    }
    drain(tasks).await;

    scanner.finalize(&env, opts).await?;
    writer.close()?;

    let end = Utc::now();
    let duration = (end - start).num_milliseconds() as f64 / 1000.0;
    Ok(ScannerDuration { start, end, duration })
}

async fn drain<F: std::future::Future>(mut tasks: FuturesUnordered<F>) {
    while tasks.next().await.is_some() {}
}

fn filter_by_suffix(domains: &[String], suffix: Option<&str>) -> Vec<String> {
    match suffix {
        Some(suffix) => domains
            .iter()
            .filter(|d| d.ends_with(suffix))
            .cloned()
            .collect(),
        None => domains.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment as Env;
    use crate::local_executor::NullHeadlessBridge;
    use crate::scanner::Payload;
    use async_trait::async_trait;
    use serde_json::json;

    struct OkScanner;

    #[async_trait]
    impl Scanner for OkScanner {
        fn name(&self) -> &'static str {
            "ok"
        }
        fn headers(&self) -> Vec<String> {
            vec!["OK".to_string()]
        }
        fn to_rows(&self, _payload: &Payload) -> Vec<Vec<String>> {
            vec![vec!["True".to_string()]]
        }
        async fn scan(
            &self,
            _domain: &str,
            _env: &Env,
            _opts: &RunOptions,
        ) -> ScanResult<Payload> {
            Ok(json!({"ok": true}))
        }
    }

    struct AbortingScanner;

    #[async_trait]
    impl Scanner for AbortingScanner {
        fn name(&self) -> &'static str {
            "aborts"
        }
        fn headers(&self) -> Vec<String> {
            vec![]
        }
        fn to_rows(&self, _payload: &Payload) -> Vec<Vec<String>> {
            vec![]
        }
        async fn init(&self, _env: &Env, _opts: &RunOptions) -> ScanResult<InitOutcome> {
            Ok(InitOutcome::Abort)
        }
    }

    #[tokio::test]
    async fn runs_every_domain_within_the_worker_budget() {
        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            meta: false,
            cache: false,
            results_dir: dir.path().to_path_buf(),
            default_workers: 2,
            ..Default::default()
        };
        let bridge = NullHeadlessBridge;
        let local = LocalExecutor::new(&bridge);
        let executors = SharedExecutors {
            local: &local,
            remote: None,
        };
        let domains = vec![
            "a.example".to_string(),
            "b.example".to_string(),
            "c.example".to_string(),
        ];

        run_scanner(&OkScanner, &domains, Uuid::nil(), &opts, None, &executors)
            .await
            .unwrap();

        let mut reader = csv::Reader::from_path(dir.path().join("ok.csv")).unwrap();
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn init_abort_propagates_as_a_fatal_error() {
        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            results_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let bridge = NullHeadlessBridge;
        let local = LocalExecutor::new(&bridge);
        let executors = SharedExecutors {
            local: &local,
            remote: None,
        };

        let err = run_scanner(&AbortingScanner, &[], Uuid::nil(), &opts, None, &executors)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Aborted(name) if name == "aborts"));
    }

    #[tokio::test]
    async fn suffix_filter_restricts_the_domain_set() {
        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            meta: false,
            cache: false,
            results_dir: dir.path().to_path_buf(),
            suffix: Some(".net".to_string()),
            ..Default::default()
        };
        let bridge = NullHeadlessBridge;
        let local = LocalExecutor::new(&bridge);
        let executors = SharedExecutors {
            local: &local,
            remote: None,
        };
        let domains = vec!["a.com".to_string(), "b.net".to_string()];

        run_scanner(&OkScanner, &domains, Uuid::nil(), &opts, None, &executors)
            .await
            .unwrap();

        let mut reader = csv::Reader::from_path(dir.path().join("ok.csv")).unwrap();
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "b.net");
    }
}
