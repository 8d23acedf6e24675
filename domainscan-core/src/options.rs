//! Run-wide configuration, threaded through every scanner lifecycle hook as
//! the `opts` parameter (spec §3 "Scanner Module": `init(env, opts)`, etc.)
//! and consumed by the Lifecycle Driver / Run Controller for worker counts,
//! cache/meta/sort toggles, and the default executor choice.

use std::collections::HashMap;
use std::path::PathBuf;

/// Per-scanner overrides of the run-wide defaults (spec §6 "scanner-specific
/// overrides for worker count and remote flag").
#[derive(Debug, Clone, Default)]
pub struct ScannerOverride {
    pub workers: Option<usize>,
    pub lambda: Option<bool>,
}

/// The global maximum parallelism across all scanners (spec §5: 1000).
pub const GLOBAL_MAX_WORKERS: usize = 1000;

/// The post-run enrichment settle delay (spec §4.7, §5: ~20s).
pub const SETTLE_DELAY: std::time::Duration = std::time::Duration::from_secs(20);

/// The remote executor's connect/read timeout (spec §5: >= 15 minutes).
pub const REMOTE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(900);

/// Run-wide options, shared (read-only) across every scanner and domain
/// task in a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Read-through/write-through result cache toggle.
    pub cache: bool,
    /// Whether per-attempt [`crate::meta::Meta`] is collected and emitted.
    pub meta: bool,
    /// Sort each output table lexicographically by Domain after closing it.
    pub sort: bool,
    /// Optional suffix filter restricting which domains are scanned.
    pub suffix: Option<String>,
    /// Default executor choice when a scanner doesn't override it.
    pub lambda_default: bool,
    /// Bounded retry budget for the remote executor.
    pub lambda_retries: u32,
    /// Enables the post-run remote enrichment pass.
    pub lambda_details: bool,
    /// Base URL of the remote invocation endpoint (collaborator concern:
    /// the core neither chooses this nor encodes credentials into it).
    pub remote_base_url: String,
    /// Credential profile name forwarded to the remote SDK; opaque to the
    /// core beyond being recorded (spec.md §6 "credential profile name").
    pub lambda_profile: Option<String>,
    /// Default worker count for a scanner that doesn't override it.
    pub default_workers: usize,
    /// Hard ceiling on parallelism regardless of any override.
    pub global_max_workers: usize,
    /// Per-scanner worker/lambda overrides, keyed by scanner name.
    pub scanner_overrides: HashMap<String, ScannerOverride>,
    pub cache_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl RunOptions {
    pub fn workers_for(&self, scanner_name: &str, scanner_default: Option<usize>) -> usize {
        let requested = self
            .scanner_overrides
            .get(scanner_name)
            .and_then(|o| o.workers)
            .or(scanner_default)
            .unwrap_or(self.default_workers);
        requested.min(self.global_max_workers)
    }

    pub fn use_lambda_for(&self, scanner_name: &str, scanner_default: Option<bool>) -> bool {
        self.scanner_overrides
            .get(scanner_name)
            .and_then(|o| o.lambda)
            .or(scanner_default)
            .unwrap_or(self.lambda_default)
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            cache: true,
            meta: true,
            sort: false,
            suffix: None,
            lambda_default: false,
            lambda_retries: 0,
            lambda_details: false,
            remote_base_url: String::new(),
            lambda_profile: None,
            default_workers: 10,
            global_max_workers: GLOBAL_MAX_WORKERS,
            scanner_overrides: HashMap::new(),
            cache_dir: PathBuf::from("./cache"),
            results_dir: PathBuf::from("./results"),
        }
    }
}

/// The full input to one run: the domain set, the ordered scanner
/// selection, and the options above.
pub struct RunRequest {
    pub domains: Vec<String>,
    pub scanners: Vec<std::sync::Arc<dyn crate::scanner::Scanner>>,
    pub options: RunOptions,
    /// The argv this run was invoked with, recorded verbatim into
    /// [`crate::meta::RunMetadata::command`].
    pub command: String,
}
