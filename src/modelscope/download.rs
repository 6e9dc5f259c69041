//! Snapshot downloads through the ModelScope Python SDK.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::snapshot::resolve_model_root;
use crate::core::ToolError;
use crate::runtime::{run_captured, Invocation};
use crate::util::{absolutize, expand_user, tail_chars};

const DOWNLOAD_SCRIPT: &str = include_str!("scripts/snapshot_download.py");
const SNAPSHOT_MARKER: &str = "__SNAPSHOT__=";
const MISSING_SDK_EXIT: i32 = 3;

/// Fetches a model snapshot into a cache directory.
#[async_trait]
pub trait SnapshotDownloader: Send + Sync {
    /// Download `model_id` below `cache_dir` and return the raw snapshot path.
    async fn snapshot_download(&self, model_id: &str, cache_dir: &Path) -> Result<PathBuf, ToolError>;
}

/// [`SnapshotDownloader`] calling `modelscope.snapshot_download` in a Python
/// subprocess.
#[derive(Debug, Clone)]
pub struct ModelScopeSdk {
    python: String,
}

impl ModelScopeSdk {
    /// Use the given Python interpreter.
    pub fn new(python: impl Into<String>) -> Self {
        Self { python: python.into() }
    }
}

/// Extract the snapshot path printed by the download script.
pub fn parse_snapshot_marker(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix(SNAPSHOT_MARKER))
        .map(str::trim)
        .filter(|path| !path.is_empty())
}

#[async_trait]
impl SnapshotDownloader for ModelScopeSdk {
    async fn snapshot_download(&self, model_id: &str, cache_dir: &Path) -> Result<PathBuf, ToolError> {
        let cache_str = cache_dir.display().to_string();
        let mut env = BTreeMap::new();
        env.insert("MODELSCOPE_CACHE".to_string(), cache_str.clone());
        env.insert("MODELSCOPE_HOME".to_string(), cache_str.clone());
        if std::env::var_os("VLLM_USE_MODELSCOPE").is_none() {
            env.insert("VLLM_USE_MODELSCOPE".to_string(), "True".to_string());
        }
        let invocation = Invocation::new(
            &self.python,
            ["-c".to_string(), DOWNLOAD_SCRIPT.to_string(), model_id.to_string(), cache_str],
        )
        .with_env(env);

        info!(model = model_id, cache = %cache_dir.display(), "downloading snapshot");
        let output = run_captured(&invocation, None).await?;
        if output.code == Some(MISSING_SDK_EXIT) {
            return Err(ToolError::Config(
                "ModelScope is required. Install it with 'pip install modelscope'.".into(),
            ));
        }
        if !output.success() {
            warn!(stderr = %tail_chars(&output.stderr, 2000), "snapshot download failed");
            return Err(ToolError::CommandFailed {
                command: format!("{} -c <snapshot_download> {model_id}", self.python),
                code: output.code,
            });
        }
        debug!(stderr = %tail_chars(&output.stderr, 2000), "download finished");
        parse_snapshot_marker(&output.stdout)
            .map(PathBuf::from)
            .ok_or_else(|| ToolError::Config(format!("ModelScope download returned empty path for {model_id}")))
    }
}

/// Download a snapshot and return the resolved model directory.
pub async fn download_model<D: SnapshotDownloader + ?Sized>(
    downloader: &D,
    model_id: &str,
    cache_dir: &Path,
) -> Result<PathBuf, ToolError> {
    let cache_dir = absolutize(&expand_user(cache_dir));
    std::fs::create_dir_all(&cache_dir).map_err(|e| ToolError::io(&cache_dir, e))?;
    let raw = absolutize(&downloader.snapshot_download(model_id, &cache_dir).await?);
    let model_dir = resolve_model_root(&raw);
    if model_dir != raw {
        info!("using nested model path {}", model_dir.display());
    }
    info!("using model path {}", model_dir.display());
    Ok(model_dir)
}
