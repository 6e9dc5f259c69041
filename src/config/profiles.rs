//! Model profiles (`model_profiles.yaml`): serve commands, environment and
//! KV-cache calibration parameters per named profile.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::env::EnvMap;
use crate::core::ToolError;

/// Default serve entrypoint when a profile does not name one.
pub const DEFAULT_SERVE_ENTRYPOINT: &str = "python -m vllm.entrypoints.openai.api_server";

/// Parsed profile file.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileBook {
    /// Profiles keyed by name.
    pub profiles: BTreeMap<String, ModelProfile>,
}

/// A named configuration bundle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelProfile {
    /// Free-form description shown by `list`.
    #[serde(default)]
    pub description: String,
    /// Environment shared by every action of the profile.
    #[serde(default)]
    pub env: EnvMap,
    /// Serve section.
    #[serde(default)]
    pub serve: ServeSection,
    /// KV-cache calibration section.
    #[serde(default)]
    pub kv_calibration: Option<KvCalibrationSection>,
}

/// How to launch the inference server for a profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServeSection {
    /// Entrypoint command line, shell-split before use.
    #[serde(default)]
    pub entrypoint: Option<String>,
    /// Extra arguments; each entry is shell-split.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment layered over the profile environment.
    #[serde(default)]
    pub env: EnvMap,
}

impl ServeSection {
    /// Entrypoint, falling back to [`DEFAULT_SERVE_ENTRYPOINT`].
    pub fn entrypoint(&self) -> &str {
        self.entrypoint.as_deref().unwrap_or(DEFAULT_SERVE_ENTRYPOINT)
    }
}

/// KV-cache calibration parameters. Unset fields take CLI or built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KvCalibrationSection {
    /// ModelScope model identifier.
    #[serde(default)]
    pub model_id: String,
    /// Where the KV scales are written.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Calibration JSONL path.
    #[serde(default)]
    pub calib_data: Option<PathBuf>,
    /// Number of calibration samples.
    #[serde(default)]
    pub samples: Option<u32>,
    /// Calibration sequence length.
    #[serde(default)]
    pub seq_len: Option<u32>,
    /// Template for synthesized samples; `{i}` is replaced by the sample index.
    #[serde(default)]
    pub dataset_prompt: Option<String>,
    /// Snapshot cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// llm-compressor checkout location.
    #[serde(default)]
    pub llm_compressor_repo: Option<PathBuf>,
    /// Quantization script, relative to the llm-compressor checkout.
    #[serde(default)]
    pub quantization_script: Option<String>,
    /// Extra arguments for the quantization script.
    #[serde(default)]
    pub quant_args: Vec<String>,
}

impl ProfileBook {
    /// Read and parse a profiles file.
    pub fn load(path: &Path) -> Result<Self, ToolError> {
        if !path.exists() {
            return Err(ToolError::NotFound {
                what: "Config",
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| ToolError::io(path, e))?;
        Self::from_yaml_str(&text).map_err(|err| match err {
            ToolError::Yaml { source, .. } => ToolError::Yaml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse profiles from YAML text.
    pub fn from_yaml_str(input: &str) -> Result<Self, ToolError> {
        let root: serde_yaml::Value = serde_yaml::from_str(input).map_err(|source| ToolError::Yaml {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        if !root.is_mapping() {
            return Err(ToolError::Config("Invalid config root".into()));
        }
        if !root.get("profiles").is_some_and(serde_yaml::Value::is_mapping) {
            return Err(ToolError::Config("'profiles' section missing".into()));
        }
        serde_yaml::from_value(root).map_err(|source| ToolError::Yaml {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// Look up a profile, listing the available names when it is unknown.
    pub fn ensure(&self, name: &str) -> Result<&ModelProfile, ToolError> {
        self.profiles.get(name).ok_or_else(|| {
            let options = self.profiles.keys().cloned().collect::<Vec<_>>().join(", ");
            ToolError::Config(format!("Unknown profile '{name}'. Available: {options}"))
        })
    }

    /// `(name, description)` pairs sorted by name.
    pub fn summaries(&self) -> Vec<(&str, &str)> {
        self.profiles
            .iter()
            .map(|(name, profile)| (name.as_str(), profile.description.as_str()))
            .collect()
    }
}
