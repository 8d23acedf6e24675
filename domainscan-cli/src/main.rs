use clap::Parser;
use domainscan_core::controller::RunController;
use domainscan_core::domains::read_domain_list;
use domainscan_core::error::ScanError;
use domainscan_core::options::{RunOptions, ScannerOverride};
use domainscan_core::scanner::Scanner;
use domainscan_core::scanners::{FlakyRemoteScanner, NoopScanner, NullPayloadScanner};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Domain scan orchestrator: runs a domain set through a set of named
/// scanner modules, locally or via a remote function-as-a-service endpoint.
#[derive(Parser, Debug)]
#[command(name = "domainscan", version, about)]
struct Cli {
    /// Path to a newline-delimited domain list, or a single literal domain.
    domains: String,

    /// Comma-separated scanner names to run, in order.
    #[arg(long, value_delimiter = ',')]
    scan: Vec<String>,

    /// Enable the read-through/write-through result cache.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    cache: bool,

    /// Collect and emit per-attempt meta columns.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    meta: bool,

    /// Sort each output table lexicographically by Domain.
    #[arg(long, default_value_t = false)]
    sort: bool,

    /// Only scan domains ending with this suffix.
    #[arg(long)]
    suffix: Option<String>,

    /// Default executor: remote (true) or local (false).
    #[arg(long, default_value_t = false)]
    lambda: bool,

    /// Credential profile name forwarded to the remote SDK.
    #[arg(long)]
    lambda_profile: Option<String>,

    /// Bounded retry budget for the remote executor.
    #[arg(long, default_value_t = 0)]
    lambda_retries: u32,

    /// Enable the post-run remote enrichment pass.
    #[arg(long, default_value_t = false)]
    lambda_details: bool,

    /// Base URL of the remote invocation endpoint.
    #[arg(long, default_value = "http://localhost:8080")]
    remote_base_url: String,

    /// Per-scanner override, repeatable: `NAME:workers=N` or `NAME:lambda=BOOL`.
    #[arg(long = "scanner-opt")]
    scanner_opt: Vec<String>,

    /// Directory holding cached scan results.
    #[arg(long, default_value = "./cache")]
    cache_dir: PathBuf,

    /// Directory holding output tables and run metadata.
    #[arg(long, default_value = "./results")]
    results_dir: PathBuf,
}

fn builtin_scanner(name: &str) -> Option<Arc<dyn Scanner>> {
    match name {
        "noop" => Some(Arc::new(NoopScanner)),
        "null_scanner" => Some(Arc::new(NullPayloadScanner)),
        "flaky" => Some(Arc::new(FlakyRemoteScanner)),
        _ => None,
    }
}

fn parse_scanner_overrides(raw: &[String]) -> anyhow::Result<HashMap<String, ScannerOverride>> {
    let mut overrides: HashMap<String, ScannerOverride> = HashMap::new();
    for entry in raw {
        let (name, kv) = entry
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("invalid --scanner-opt '{entry}', expected NAME:key=value"))?;
        let (key, value) = kv
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid --scanner-opt '{entry}', expected NAME:key=value"))?;
        let slot = overrides.entry(name.to_string()).or_default();
        match key {
            "workers" => {
                slot.workers = Some(value.parse().map_err(|_| {
                    anyhow::anyhow!("invalid worker count '{value}' in --scanner-opt '{entry}'")
                })?);
            }
            "lambda" => {
                slot.lambda = Some(value.parse().map_err(|_| {
                    anyhow::anyhow!("invalid bool '{value}' in --scanner-opt '{entry}'")
                })?);
            }
            other => anyhow::bail!("unknown --scanner-opt key '{other}' in '{entry}'"),
        }
    }
    Ok(overrides)
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = std::env::args().collect::<Vec<_>>().join(" ");

    let domains = read_domain_list(&cli.domains)?;

    let mut scanners = Vec::with_capacity(cli.scan.len());
    for name in &cli.scan {
        let scanner = builtin_scanner(name)
            .ok_or_else(|| anyhow::anyhow!("unknown scanner '{name}'"))?;
        scanners.push(scanner);
    }
    if scanners.is_empty() {
        anyhow::bail!("no scanners selected; pass --scan NAME[,NAME...]");
    }

    std::fs::create_dir_all(&cli.cache_dir)?;
    std::fs::create_dir_all(&cli.results_dir)?;

    let opts = RunOptions {
        cache: cli.cache,
        meta: cli.meta,
        sort: cli.sort,
        suffix: cli.suffix,
        lambda_default: cli.lambda,
        lambda_retries: cli.lambda_retries,
        lambda_details: cli.lambda_details,
        remote_base_url: cli.remote_base_url,
        lambda_profile: cli.lambda_profile,
        scanner_overrides: parse_scanner_overrides(&cli.scanner_opt)?,
        cache_dir: cli.cache_dir,
        results_dir: cli.results_dir,
        ..RunOptions::default()
    };

    let controller = RunController::new();
    let result = controller.run(&domains, &scanners, &opts, command).await;

    match result {
        Ok(metadata) => {
            tracing::info!(scan_uuid = %metadata.scan_uuid, duration = metadata.duration, "run complete");
            Ok(())
        }
        Err(ScanError::Configuration(msg)) => anyhow::bail!("configuration error: {msg}"),
        Err(ScanError::Aborted(scanner)) => anyhow::bail!("scanner '{scanner}' aborted the run"),
        Err(e) => Err(e.into()),
    }
}
