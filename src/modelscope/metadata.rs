//! Snapshot metadata stored next to a model cache.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::paths::normalize_model_id;
use crate::core::ToolError;
use crate::util::seconds_timestamp;

/// Metadata file name inside a cache root.
pub const METADATA_FILENAME: &str = ".modelscope-manage.json";

/// Record of where a model snapshot lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Normalized model identifier.
    pub model_id: String,
    /// Cache root the snapshot was downloaded into.
    pub cache_root: String,
    /// Resolved snapshot directory.
    pub snapshot_path: String,
    /// Last update, ISO-8601 UTC seconds.
    pub updated_at: String,
}

/// Metadata path for a cache root.
pub fn metadata_path(cache_root: &Path) -> PathBuf {
    cache_root.join(METADATA_FILENAME)
}

/// Write metadata, creating the cache root if needed.
pub fn write_snapshot_metadata(
    cache_root: &Path,
    model_id: &str,
    snapshot_path: &Path,
    now: DateTime<Utc>,
) -> Result<SnapshotMetadata, ToolError> {
    let meta = SnapshotMetadata {
        model_id: normalize_model_id(model_id),
        cache_root: cache_root.display().to_string(),
        snapshot_path: snapshot_path.display().to_string(),
        updated_at: seconds_timestamp(now),
    };
    std::fs::create_dir_all(cache_root).map_err(|e| ToolError::io(cache_root, e))?;
    let path = metadata_path(cache_root);
    let body = serde_json::to_string_pretty(&meta).map_err(|source| ToolError::Json {
        path: path.clone(),
        source,
    })?;
    std::fs::write(&path, body).map_err(|e| ToolError::io(&path, e))?;
    Ok(meta)
}

/// Read metadata; a missing or unreadable file yields `None`.
pub fn read_snapshot_metadata(cache_root: &Path) -> Option<SnapshotMetadata> {
    let text = std::fs::read_to_string(metadata_path(cache_root)).ok()?;
    serde_json::from_str(&text).ok()
}
