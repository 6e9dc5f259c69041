//! Core abstractions: errors, command execution, suite running, results and
//! run comparison.

pub mod compare;
pub mod error;
pub mod executor;
pub mod results;
pub mod suite;

pub use compare::{
    compare, index_results, load_results, Comparison, ComparisonEntry, ResultEntry, ResultIndex,
    ResultKey,
};
pub use error::{AppResult, ToolError};
pub use executor::{CommandOutcome, CommandRequest, CommandRunner, ShellRunner};
pub use results::{
    format_returncode, resolve_output_path, write_results, CommandRecord, CommandStatus, RunSummary,
};
pub use suite::SuiteRunner;
