//! # vLLM Extras
//!
//! Operational tooling around a vLLM development checkout.
//!
//! The crate ships four command-line tools:
//!
//! - **`run-tests`**: runs named suites of shell commands from a YAML test
//!   matrix, enforcing per-command timeouts, and writes a JSON results file.
//! - **`compare-results`**: diffs two results files and reports added,
//!   missing, status-changed and slower commands.
//! - **`modelscope-manage`**: downloads ModelScope snapshots, repairs them
//!   for offline Transformers loading, manages Podman volumes and runs
//!   KV-cache calibration through llm-compressor.
//! - **`validate-env`**: smoke tests for CUDA, PyTorch and vLLM installs.
//!
//! ## Running a suite
//!
//! ```rust,ignore
//! use vllm_extras::config::TestMatrix;
//! use vllm_extras::core::{ShellRunner, SuiteRunner};
//!
//! let matrix = TestMatrix::load("extras/testing/test_matrix.yaml".as_ref())?;
//! let suites = matrix.collect_suites("smoke", &[])?;
//! let records = SuiteRunner::new(ShellRunner::new(), "smoke")
//!     .run_selected(&matrix, &suites)
//!     .await?;
//! ```
//!
//! Everything that touches the outside world sits behind a trait
//! ([`core::CommandRunner`], [`modelscope::SnapshotDownloader`],
//! [`modelscope::ContainerRuntime`], [`modelscope::ProcessLauncher`]) so the
//! orchestration can be tested without GPUs, Python or Podman.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Configuration models: test matrix, model profiles, environment helpers.
pub mod config;
/// Core abstractions: errors, command execution, suites, results, comparison.
pub mod core;
/// Builders turning profiles and plans into runnable commands.
pub mod builders;
/// Environment smoke tests.
pub mod envcheck;
/// ModelScope model cache management.
pub mod modelscope;
/// Process execution.
pub mod runtime;
/// Shared utilities.
pub mod util;
