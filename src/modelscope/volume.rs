//! Podman volumes mirroring the model and KV caches.
//!
//! Volume management is best effort: a missing `podman` or a failed command
//! is reported as a warning and never aborts the calling action.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::ToolError;
use crate::runtime::{run_captured, Invocation};

/// Failure of a container runtime command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VolumeError {
    /// The runtime binary is not installed.
    #[error("podman CLI not found")]
    Unavailable,
    /// The runtime reported an error.
    #[error("{0}")]
    Command(String),
}

/// Volume operations of a container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Succeeds when the volume exists.
    async fn inspect_volume(&self, name: &str) -> Result<(), VolumeError>;
    /// Create a volume.
    async fn create_volume(&self, name: &str) -> Result<(), VolumeError>;
    /// Remove a volume.
    async fn remove_volume(&self, name: &str) -> Result<(), VolumeError>;
}

/// [`ContainerRuntime`] backed by the `podman` CLI.
#[derive(Debug, Clone)]
pub struct PodmanCli {
    program: String,
}

impl Default for PodmanCli {
    fn default() -> Self {
        Self {
            program: "podman".into(),
        }
    }
}

impl PodmanCli {
    async fn volume(&self, action: &str, name: &str) -> Result<(), VolumeError> {
        let invocation = Invocation::new(&self.program, ["volume", action, name]);
        match run_captured(&invocation, None).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => {
                let message = match output.stderr.trim() {
                    "" => output.stdout.trim().to_string(),
                    stderr => stderr.to_string(),
                };
                Err(VolumeError::Command(message))
            }
            Err(ToolError::Spawn { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(VolumeError::Unavailable)
            }
            Err(err) => Err(VolumeError::Command(err.to_string())),
        }
    }
}

#[async_trait]
impl ContainerRuntime for PodmanCli {
    async fn inspect_volume(&self, name: &str) -> Result<(), VolumeError> {
        self.volume("inspect", name).await
    }

    async fn create_volume(&self, name: &str) -> Result<(), VolumeError> {
        self.volume("create", name).await
    }

    async fn remove_volume(&self, name: &str) -> Result<(), VolumeError> {
        self.volume("rm", name).await
    }
}

/// Result of a best-effort volume action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeAction {
    /// The volume already existed.
    Reused,
    /// The volume was created.
    Created,
    /// The volume was removed.
    Removed,
    /// Removal skipped because the volume does not exist.
    Absent,
    /// The action failed; the message is the runtime's.
    Failed(String),
}

/// Reuse or create a volume.
pub async fn ensure_volume<C: ContainerRuntime + ?Sized>(runtime: &C, name: &str) -> VolumeAction {
    if runtime.inspect_volume(name).await.is_ok() {
        info!("[volume] reuse existing Podman volume '{name}'");
        return VolumeAction::Reused;
    }
    match runtime.create_volume(name).await {
        Ok(()) => {
            info!("[volume] created Podman volume '{name}'");
            VolumeAction::Created
        }
        Err(err) => {
            warn!("[volume] unable to ensure volume '{name}': {err}");
            VolumeAction::Failed(err.to_string())
        }
    }
}

/// Remove a volume when it exists.
pub async fn remove_volume<C: ContainerRuntime + ?Sized>(runtime: &C, name: &str) -> VolumeAction {
    if runtime.inspect_volume(name).await.is_err() {
        info!("[volume] volume '{name}' not found (skip removal)");
        return VolumeAction::Absent;
    }
    match runtime.remove_volume(name).await {
        Ok(()) => {
            info!("[volume] removed Podman volume '{name}'");
            VolumeAction::Removed
        }
        Err(err) => {
            warn!("[volume] unable to remove volume '{name}': {err}");
            VolumeAction::Failed(err.to_string())
        }
    }
}
