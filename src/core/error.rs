//! Error types for tooling operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the library layer.
///
/// Messages are user-facing: the binaries print them verbatim before exiting
/// with status 1.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Configuration is structurally invalid.
    #[error("{0}")]
    Config(String),
    /// A required file does not exist.
    #[error("{what} not found: {}", .path.display())]
    NotFound {
        /// Human label for the missing file ("Test matrix", "Results file", ...).
        what: &'static str,
        /// Path that was looked up.
        path: PathBuf,
    },
    /// Filesystem failure with path context.
    #[error("io error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// JSON could not be parsed or produced.
    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        /// Source file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// YAML could not be parsed.
    #[error("invalid YAML in {}: {source}", .path.display())]
    Yaml {
        /// Source file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_yaml::Error,
    },
    /// An external program could not be started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// An external program exited unsuccessfully.
    #[error("command `{command}` exited with {}", exit_label(.code))]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit code, `-N` for signal `N`; `None` when unknown.
        code: Option<i32>,
    },
    /// An operation was refused to protect the filesystem.
    #[error("Refusing to remove root directory: {}", .0.display())]
    RefusedRootRemoval(PathBuf),
}

impl ToolError {
    /// Wrap an I/O error with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[allow(clippy::ref_option)]
fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("status {c}"))
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
