//! The `Scanner` module contract (spec §3 "Scanner Module", §6 "Scanner
//! module contract").
//!
//! A scanner is a polymorphic value exposing a required capability set
//! (`name`, `headers`, `to_rows`) and an optional lifecycle (`init`,
//! `init_domain`, `scan`, `post_scan`, `finalize`). Rather than probing for
//! attributes dynamically, every hook is a default-no-op trait method —
//! capabilities are registered simply by overriding the methods a concrete
//! scanner needs (spec §9 "avoid dynamic attribute probing").

use crate::environment::Environment;
use crate::error::ScanResult;
use crate::options::RunOptions;
use async_trait::async_trait;
use serde_json::Value;

/// A scan result. `Value::Null` means "no result" (spec's invalid sentinel
/// before caching, see [`crate::cache`]).
pub type Payload = Value;

/// Outcome of a scanner's `init` hook.
pub enum InitOutcome {
    /// Hard-abort the whole run (spec: `init` returning `false`).
    Abort,
    /// Continue, optionally merging an environment delta.
    Continue(Option<crate::environment::EnvDelta>),
}

/// Outcome of a scanner's `init_domain` hook.
pub enum DomainInitOutcome {
    /// Silently skip this domain: no row is emitted, nothing is logged
    /// (spec §9 "preserve this silent-skip semantics").
    Skip,
    /// Continue, optionally merging a per-domain environment delta.
    Continue(Option<crate::environment::EnvDelta>),
}

/// A pluggable probe module.
///
/// Implementors provide `name`, `headers`, and `to_rows`; the lifecycle
/// hooks (`init`, `init_domain`, `scan`, `post_scan`, `finalize`) default to
/// no-ops and are overridden only where the scanner actually needs them.
#[async_trait]
pub trait Scanner: Send + Sync + 'static {
    /// Unique scanner name; also the cache subdirectory and the remote
    /// function name suffix (`task_<name>`).
    fn name(&self) -> &'static str;

    /// Column names this scanner contributes, after the framework's
    /// `[Domain, Base Domain]` prefix.
    fn headers(&self) -> Vec<String>;

    /// Converts a payload into zero or more output rows (scanner-defined
    /// fan-out). Called with `Value::Null` when there is no payload; must
    /// return an empty vec in that case so the framework emits one blank row.
    fn to_rows(&self, payload: &Payload) -> Vec<Vec<String>>;

    /// True if this scanner requires the headless browser bridge instead of
    /// a plain `scan` call.
    fn scan_headless(&self) -> bool {
        false
    }

    /// Per-scanner override of the run-wide local/remote default. `None`
    /// defers to [`RunOptions::lambda_default`].
    fn use_lambda(&self) -> Option<bool> {
        None
    }

    /// Per-scanner override of the default worker count. `None` defers to
    /// [`RunOptions::default_workers`].
    fn worker_override(&self) -> Option<usize> {
        None
    }

    async fn init(&self, _env: &Environment, _opts: &RunOptions) -> ScanResult<InitOutcome> {
        Ok(InitOutcome::Continue(None))
    }

    async fn init_domain(
        &self,
        _domain: &str,
        _env: &Environment,
        _opts: &RunOptions,
    ) -> ScanResult<DomainInitOutcome> {
        Ok(DomainInitOutcome::Continue(None))
    }

    async fn scan(
        &self,
        _domain: &str,
        _env: &Environment,
        _opts: &RunOptions,
    ) -> ScanResult<Payload> {
        Ok(Value::Null)
    }

    async fn post_scan(
        &self,
        _domain: &str,
        _payload: &Payload,
        _env: &Environment,
        _opts: &RunOptions,
    ) {
    }

    async fn finalize(&self, _env: &Environment, _opts: &RunOptions) -> ScanResult<()> {
        Ok(())
    }
}
