//! Environment smoke tests for CUDA / PyTorch / vLLM installs.
//!
//! Each check produces a [`CheckResult`]; [`run_checks`] collects them into
//! an [`EnvReport`] with a readiness verdict for `sm_120` (RTX 5090) builds.

pub mod probes;
pub mod report;
pub mod toolchain;
pub mod vars;

pub use probes::{evaluate_torch, evaluate_vllm, parse_probe_output, probe_torch, probe_vllm, TorchProbe, VllmProbe};
pub use report::{run_checks, CheckResult, EnvReport, Readiness};
pub use toolchain::check_cuda_toolchain;
pub use vars::{check_environment, has_sm120, TRACKED_VARS};
