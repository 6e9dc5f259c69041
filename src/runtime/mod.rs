//! Process execution on the tokio runtime.

pub mod process;

pub use process::{exit_code, run_captured, run_inherited, CapturedOutput, Invocation};
