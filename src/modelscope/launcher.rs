//! Foreground process launching for commands whose output belongs to the user.

use async_trait::async_trait;
use tracing::info;

use crate::core::ToolError;
use crate::runtime::{run_inherited, Invocation};

/// Runs a command with inherited stdio and reports its exit code.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Launch and wait for the exit code (`-N` for signal `N`).
    async fn launch(&self, invocation: &Invocation) -> Result<Option<i32>, ToolError>;
}

/// Launches real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn launch(&self, invocation: &Invocation) -> Result<Option<i32>, ToolError> {
        run_inherited(invocation).await
    }
}

/// Announce, launch and require a zero exit code.
pub async fn run_checked<L: ProcessLauncher + ?Sized>(
    launcher: &L,
    invocation: &Invocation,
) -> Result<(), ToolError> {
    let line = invocation.display_line();
    info!("[exec] {line}");
    match launcher.launch(invocation).await? {
        Some(0) => Ok(()),
        code => Err(ToolError::CommandFailed { command: line, code }),
    }
}
