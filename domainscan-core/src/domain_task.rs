//! Orchestrates one `(scanner, domain)` attempt (spec §4.6): cache lookup,
//! executor selection, post-scan hook, cache write, row emission — all
//! wrapped so that any unexpected failure along the way is folded into
//! [`Meta::errors`] instead of aborting the task; a row is always emitted.

use crate::cache::ResultCache;
use crate::environment::Environment;
use crate::local_executor::LocalExecutor;
use crate::meta::{LambdaMeta, Meta};
use crate::options::RunOptions;
use crate::remote_executor::RemoteExecutor;
use crate::row_writer::RowWriter;
use crate::scanner::{DomainInitOutcome, Payload, Scanner};
use serde_json::Value;

/// Collaborators + configuration for one domain task, grouped so call
/// sites in [`crate::lifecycle`] don't have to thread eight positional
/// arguments through a spawn.
pub struct DomainTaskCtx<'a> {
    pub scanner: &'a dyn Scanner,
    pub base_env: &'a Environment,
    pub opts: &'a RunOptions,
    pub cache: Option<&'a ResultCache>,
    pub writer: &'a RowWriter,
    pub local: &'a LocalExecutor<'a>,
    pub remote: Option<&'a RemoteExecutor>,
    pub use_remote: bool,
}

/// Runs the full per-domain lifecycle for `domain`. Only row-writer I/O
/// failures propagate as `Err`; everything else lands in `meta.errors` and
/// the row is emitted anyway.
pub async fn run(ctx: DomainTaskCtx<'_>, domain: &str) -> crate::error::ScanResult<()> {
    let mut meta = Meta::new();

    let mut per_scan_env = ctx.base_env.clone();
    match ctx.scanner.init_domain(domain, ctx.base_env, ctx.opts).await {
        Ok(DomainInitOutcome::Skip) => return Ok(()),
        Ok(DomainInitOutcome::Continue(delta)) => per_scan_env.merge(delta),
        Err(e) => meta.errors.push(format!("init_domain failed: {e}")),
    }

    let mut payload = cached_payload(&ctx, domain, &mut meta);

    if payload.is_none() {
        payload = Some(execute(&ctx, domain, &per_scan_env, &mut meta).await);
    }
    let payload = payload.unwrap_or(Value::Null);

    ctx.scanner
        .post_scan(domain, &payload, &per_scan_env, ctx.opts)
        .await;

    if let Some(cache) = ctx.cache {
        if let Err(e) = cache.write(domain, ctx.scanner.name(), &payload) {
            meta.errors.push(format!("cache write failed: {e}"));
        }
    }
    if payload.is_null() {
        meta.errors.push("Scan returned nothing.".to_string());
    }

    for err in &meta.errors {
        tracing::warn!(scanner = ctx.scanner.name(), domain, "{err}");
    }

    emit_rows(&ctx, domain, &payload, &meta)
}

fn cached_payload(ctx: &DomainTaskCtx<'_>, domain: &str, meta: &mut Meta) -> Option<Payload> {
    if !ctx.opts.cache {
        return None;
    }
    let cache = ctx.cache?;
    match cache.read(domain, ctx.scanner.name()) {
        Ok(lookup) => lookup.into_payload(),
        Err(e) => {
            meta.errors.push(format!("cache read failed: {e}"));
            None
        }
    }
}

async fn execute(
    ctx: &DomainTaskCtx<'_>,
    domain: &str,
    per_scan_env: &Environment,
    meta: &mut Meta,
) -> Payload {
    meta.mark_start();
    // Removed for both executors per spec §4.6 step 4, regardless of
    // executor choice.
    let exec_env = per_scan_env.clone().without_fast_cache();

    let result = if ctx.use_remote {
        match ctx.remote {
            Some(remote) => {
                let mut lambda: LambdaMeta = meta.lambda.take().unwrap_or_default();
                let options_json = ctx.opts.to_envelope_json();
                let outcome = remote
                    .run(
                        ctx.scanner.name(),
                        domain,
                        &exec_env,
                        &options_json,
                        ctx.opts.lambda_retries,
                        &mut lambda,
                        &mut meta.errors,
                    )
                    .await;
                meta.lambda = Some(lambda);
                outcome
            }
            None => Err(crate::error::ScanError::Configuration(
                "remote execution requested but no RemoteExecutor is configured".to_string(),
            )),
        }
    } else {
        ctx.local.run(ctx.scanner, domain, &exec_env, ctx.opts).await
    };

    meta.mark_end();

    match result {
        Ok(payload) => payload,
        Err(e) => {
            meta.errors.push(format!("{e}"));
            Value::Null
        }
    }
}

fn emit_rows(
    ctx: &DomainTaskCtx<'_>,
    domain: &str,
    payload: &Payload,
    meta: &Meta,
) -> crate::error::ScanResult<()> {
    let base_domain = crate::base_domain::base_domain(domain);
    let header_len = ctx.scanner.headers().len();

    let mut rows = ctx.scanner.to_rows(payload);
    if rows.is_empty() {
        rows.push(Vec::new());
    }

    for mut row in rows {
        while row.len() < header_len {
            row.push(String::new());
        }

        let mut cells = Vec::with_capacity(2 + header_len + 11);
        cells.push(domain.to_string());
        cells.push(base_domain.clone());
        cells.extend(row);

        if ctx.opts.meta {
            push_meta_cells(&mut cells, meta, ctx.use_remote);
        }

        ctx.writer.write_row(&cells)?;
    }
    Ok(())
}

fn push_meta_cells(cells: &mut Vec<String>, meta: &Meta, use_remote: bool) {
    cells.push(meta.errors.join("; "));
    cells.push(fmt_time(meta.start_time));
    cells.push(fmt_time(meta.end_time));
    cells.push(meta.duration.map(|d| d.to_string()).unwrap_or_default());

    if use_remote {
        let lambda = meta.lambda.clone().unwrap_or_default();
        cells.push(lambda.request_id.unwrap_or_default());
        cells.push(lambda.log_group_name.unwrap_or_default());
        cells.push(lambda.log_stream_name.unwrap_or_default());
        cells.push(fmt_time(lambda.start_time));
        cells.push(fmt_time(lambda.end_time));
        cells.push(lambda.memory_limit.map(|m| m.to_string()).unwrap_or_default());
        cells.push(
            lambda
                .measured_duration
                .map(|d| d.to_string())
                .unwrap_or_default(),
        );
    }
}

fn fmt_time(t: Option<chrono::DateTime<chrono::Utc>>) -> String {
    t.map(|t| t.to_rfc3339()).unwrap_or_default()
}

impl RunOptions {
    /// The subset of run-wide options forwarded to a remote scanner inside
    /// the invocation envelope (spec §6: `{domain, options, scanner,
    /// environment}`).
    pub fn to_envelope_json(&self) -> Value {
        serde_json::json!({
            "cache": self.cache,
            "meta": self.meta,
            "sort": self.sort,
            "suffix": self.suffix,
            "lambda_retries": self.lambda_retries,
        })
    }
}
