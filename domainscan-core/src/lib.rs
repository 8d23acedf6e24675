//! # domainscan-core
//!
//! The scan dispatcher at the heart of a domain scan orchestrator: given a
//! domain list and a set of pluggable [`Scanner`](scanner::Scanner)
//! modules, it runs every domain through every selected scanner, dispatches
//! each probe locally or to a remote function-as-a-service endpoint,
//! applies a read-through/write-through result cache, and writes one
//! output table per scanner plus a run metadata record.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domainscan_core::controller::RunController;
//! use domainscan_core::options::RunOptions;
//! use domainscan_core::scanners::NoopScanner;
//! use domainscan_core::scanner::Scanner;
//! use std::sync::Arc;
//!
//! # async fn run() -> domainscan_core::error::ScanResult<()> {
//! let opts = RunOptions::default();
//! let scanners: Vec<Arc<dyn Scanner>> = vec![Arc::new(NoopScanner)];
//! let domains = vec!["example.com".to_string()];
//!
//! let controller = RunController::new();
//! let metadata = controller
//!     .run(&domains, &scanners, &opts, "domainscan scan=noop".to_string())
//!     .await?;
//! println!("{:#?}", metadata);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Map
//!
//! - [`cache`] — content-addressed on-disk result cache.
//! - [`row_writer`] — per-scanner output table writer.
//! - [`local_executor`] — in-process scanner invocation.
//! - [`remote_executor`] — synchronous remote function invocation with retry.
//! - [`lifecycle`] — bounded per-scanner domain fan-out.
//! - [`domain_task`] — the per-(scanner, domain) orchestration unit.
//! - [`controller`] — the top-level run entry point.
//! - [`enricher`] — post-run remote-side table enrichment.
//! - [`scanner`] — the `Scanner` trait contract.
//! - [`environment`], [`meta`], [`options`], [`error`] — shared data model.
//! - [`base_domain`] — public-suffix lookup.
//! - [`domains`] — CLI-facing domain-list reading convenience.
//! - [`scanners`] — example/demo `Scanner` implementations.

pub mod base_domain;
pub mod cache;
pub mod controller;
pub mod domain_task;
pub mod domains;
pub mod enricher;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod local_executor;
pub mod meta;
pub mod options;
pub mod remote_executor;
pub mod row_writer;
pub mod scanner;
pub mod scanners;
