//! Cache layout and model naming.

use std::path::{Path, PathBuf};

use crate::core::ToolError;
use crate::util::{expand_user, home_dir};

/// File name of calibrated KV-cache scales.
pub const KV_CACHE_FILENAME: &str = "kv_cache_scales.json";
/// Relative path of the calibration set below a KV root.
pub const CALIB_DATA_RELATIVE: &str = "calib/snippets.jsonl";

/// Trim surrounding whitespace from a model identifier.
pub fn normalize_model_id(model_id: &str) -> String {
    model_id.trim().to_string()
}

/// Filesystem- and volume-safe key for a model identifier.
///
/// Alphanumerics, `-`, `_` and `.` are kept; everything else becomes `_`.
pub fn safe_model_key(model_id: &str) -> String {
    normalize_model_id(model_id)
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Kind of container volume kept per model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    /// Snapshot cache volume.
    Model,
    /// Calibrated KV data volume.
    Kv,
}

impl VolumeKind {
    /// Volume name prefix.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Model => "model-",
            Self::Kv => "kv-",
        }
    }

    /// Volume name for a model.
    pub fn volume_name(self, model_id: &str) -> String {
        format!("{}{}", self.prefix(), safe_model_key(model_id))
    }
}

/// Well-known directories used by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    /// User home directory.
    pub home: PathBuf,
    /// ModelScope cache base (`~/.cache/modelscope`).
    pub modelscope_cache: PathBuf,
    /// Hugging Face home (`~/.cache/hf`).
    pub hf_home: PathBuf,
    /// KV data base (`~/kvdata`).
    pub kv_root: PathBuf,
    /// Default llm-compressor checkout (`~/.local/share/llm-compressor`).
    pub llm_compressor_repo: PathBuf,
}

impl CacheLayout {
    /// Default layout below `home`.
    pub fn from_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            modelscope_cache: home.join(".cache").join("modelscope"),
            hf_home: home.join(".cache").join("hf"),
            kv_root: home.join("kvdata"),
            llm_compressor_repo: home.join(".local").join("share").join("llm-compressor"),
            home,
        }
    }

    /// Layout for the current user.
    ///
    /// `VLLM_EXTRAS_KV_ROOT` relocates the KV data base.
    pub fn discover() -> Result<Self, ToolError> {
        let home = home_dir()
            .ok_or_else(|| ToolError::Config("HOME is not set; cannot resolve cache directories".into()))?;
        let mut layout = Self::from_home(home);
        if let Some(kv_root) = std::env::var_os("VLLM_EXTRAS_KV_ROOT").filter(|v| !v.is_empty()) {
            layout.kv_root = expand_user(Path::new(&kv_root));
        }
        Ok(layout)
    }

    /// Per-model snapshot cache root.
    pub fn model_cache_root(&self, model_id: &str) -> PathBuf {
        self.modelscope_cache.join(safe_model_key(model_id))
    }

    /// Per-model KV data root.
    pub fn kv_model_root(&self, model_id: &str) -> PathBuf {
        self.kv_root.join(safe_model_key(model_id))
    }

    /// Default KV scales output for a model.
    pub fn kv_scales_path(&self, model_id: &str) -> PathBuf {
        self.kv_model_root(model_id).join(KV_CACHE_FILENAME)
    }

    /// Default calibration set for a model.
    pub fn calib_data_path(&self, model_id: &str) -> PathBuf {
        self.kv_model_root(model_id).join(CALIB_DATA_RELATIVE)
    }
}
