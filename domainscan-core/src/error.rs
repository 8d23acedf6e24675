//! Error taxonomy for the dispatcher.
//!
//! Only the fatal branches of spec §7 (configuration errors, scanner-init
//! abort) ever leave [`crate::controller::RunController::run`] as an `Err`.
//! Per-domain failures are caught at the task boundary and folded into
//! [`crate::meta::Meta::errors`] instead — see [`crate::domain_task`].

/// Errors that can terminate a run or a single fallible operation.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Missing domains/scanners, missing cache directory, or any other
    /// misconfiguration caught before a run starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A scanner's `init` hook returned [`crate::scanner::InitOutcome::Abort`].
    #[error("scanner '{0}' init aborted the run")]
    Aborted(String),

    /// Cache or result-table I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote executor exhausted its retry budget or hit a
    /// non-retriable transport failure.
    #[error("remote invocation error: {0}")]
    Remote(String),

    /// JSON encode/decode failure (cache entries, remote envelopes).
    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    /// CSV read/write failure (row writer, post-run enricher).
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type ScanResult<T> = Result<T, ScanError>;
