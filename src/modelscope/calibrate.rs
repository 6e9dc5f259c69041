//! KV-cache calibration planning and inputs.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use super::paths::{normalize_model_id, CacheLayout};
use crate::config::KvCalibrationSection;
use crate::core::ToolError;
use crate::util::{absolutize, expand_user};

/// Default number of calibration samples.
pub const DEFAULT_SAMPLES: u32 = 512;
/// Default calibration sequence length.
pub const DEFAULT_SEQ_LEN: u32 = 4096;
/// Default template for synthesized samples.
pub const DEFAULT_DATASET_PROMPT: &str = "Calibration sample {i}. Short text for KV scales.";
/// Default quantization script inside the llm-compressor checkout.
pub const DEFAULT_QUANT_SCRIPT: &str = "examples/quantization_non_uniform/quantization_multiple_modifiers.py";
/// File name of the runner installed into the checkout.
pub const RUNNER_FILENAME: &str = "_modelscope_runner.py";

const RUNNER_SCRIPT: &str = include_str!("scripts/calibration_runner.py");

/// Command-line values that take precedence over a profile section.
#[derive(Debug, Clone, Default)]
pub struct CalibrationOverrides {
    /// Scales output file.
    pub output: Option<PathBuf>,
    /// Calibration JSONL file.
    pub calib_data: Option<PathBuf>,
    /// Sample count.
    pub samples: Option<u32>,
    /// Sequence length.
    pub seq_len: Option<u32>,
    /// Sample template.
    pub dataset_prompt: Option<String>,
    /// Snapshot cache directory.
    pub cache_dir: Option<PathBuf>,
    /// llm-compressor checkout.
    pub llm_compressor_repo: Option<PathBuf>,
    /// Quantization script, relative to the checkout.
    pub quant_script: Option<String>,
    /// Extra quantization script arguments, appended after the profile's.
    pub quant_args: Vec<String>,
}

/// Fully resolved calibration parameters. All paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationPlan {
    /// Normalized model identifier.
    pub model_id: String,
    /// Scales output file.
    pub output: PathBuf,
    /// Calibration JSONL file.
    pub calib_data: PathBuf,
    /// Sample count.
    pub samples: u32,
    /// Sequence length.
    pub seq_len: u32,
    /// Sample template.
    pub dataset_prompt: String,
    /// Snapshot cache directory.
    pub cache_dir: PathBuf,
    /// llm-compressor checkout.
    pub llm_compressor_repo: PathBuf,
    /// Quantization script, relative to the checkout.
    pub quantization_script: String,
    /// Extra quantization script arguments.
    pub quant_args: Vec<String>,
}

fn resolve(path: &Path) -> PathBuf {
    absolutize(&expand_user(path))
}

impl CalibrationPlan {
    /// Plan from a profile's `kv_calibration` section.
    ///
    /// The cache directory falls back to `env_cache` (the caller's
    /// `MODELSCOPE_CACHE`) and then to the shared ModelScope cache.
    pub fn from_profile(
        profile: &str,
        section: Option<&KvCalibrationSection>,
        overrides: &CalibrationOverrides,
        layout: &CacheLayout,
        env_cache: Option<&str>,
    ) -> Result<Self, ToolError> {
        let section = section
            .ok_or_else(|| ToolError::Config(format!("Profile '{profile}' missing 'kv_calibration' mapping")))?;
        let model_id = normalize_model_id(&section.model_id);
        if model_id.is_empty() {
            return Err(ToolError::Config("kv_calibration.model_id must be provided".into()));
        }
        let cache_dir = overrides
            .cache_dir
            .clone()
            .or_else(|| section.cache_dir.clone())
            .or_else(|| env_cache.filter(|v| !v.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| layout.modelscope_cache.clone());
        let mut quant_args = section.quant_args.clone();
        quant_args.extend(overrides.quant_args.iter().cloned());

        Ok(Self {
            output: resolve(
                &overrides
                    .output
                    .clone()
                    .or_else(|| section.output.clone())
                    .unwrap_or_else(|| layout.kv_scales_path(&model_id)),
            ),
            calib_data: resolve(
                &overrides
                    .calib_data
                    .clone()
                    .or_else(|| section.calib_data.clone())
                    .unwrap_or_else(|| layout.calib_data_path(&model_id)),
            ),
            samples: overrides.samples.or(section.samples).unwrap_or(DEFAULT_SAMPLES),
            seq_len: overrides.seq_len.or(section.seq_len).unwrap_or(DEFAULT_SEQ_LEN),
            dataset_prompt: overrides
                .dataset_prompt
                .clone()
                .or_else(|| section.dataset_prompt.clone())
                .unwrap_or_else(|| DEFAULT_DATASET_PROMPT.to_string()),
            cache_dir: resolve(&cache_dir),
            llm_compressor_repo: resolve(
                &overrides
                    .llm_compressor_repo
                    .clone()
                    .or_else(|| section.llm_compressor_repo.clone())
                    .unwrap_or_else(|| layout.llm_compressor_repo.clone()),
            ),
            quantization_script: overrides
                .quant_script
                .clone()
                .or_else(|| section.quantization_script.clone())
                .unwrap_or_else(|| DEFAULT_QUANT_SCRIPT.to_string()),
            quant_args,
            model_id,
        })
    }

    /// Plan for a model given on the command line.
    pub fn adhoc(model: &str, overrides: &CalibrationOverrides, layout: &CacheLayout) -> Result<Self, ToolError> {
        let section = KvCalibrationSection {
            model_id: model.to_string(),
            cache_dir: Some(layout.model_cache_root(model)),
            ..KvCalibrationSection::default()
        };
        Self::from_profile("<command line>", Some(&section), overrides, layout, None)
    }

    /// Absolute path of the quantization script.
    pub fn quant_script_path(&self) -> PathBuf {
        absolutize(&self.llm_compressor_repo.join(&self.quantization_script))
    }
}

/// Render one calibration sample; `{i}` becomes the sample index.
pub fn render_prompt(template: &str, index: u32) -> String {
    template.replace("{i}", &index.to_string())
}

/// Write `samples` lines of `{"text": ...}` JSON to `path`.
pub fn write_default_calib(path: &Path, samples: u32, template: &str) -> Result<(), ToolError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ToolError::io(parent, e))?;
    }
    let file = std::fs::File::create(path).map_err(|e| ToolError::io(path, e))?;
    let mut writer = std::io::BufWriter::new(file);
    for index in 0..samples {
        let line = serde_json::json!({ "text": render_prompt(template, index) });
        writeln!(writer, "{line}").map_err(|e| ToolError::io(path, e))?;
    }
    writer.flush().map_err(|e| ToolError::io(path, e))?;
    info!("[kv-calibrate] wrote calibration set -> {}", path.display());
    Ok(())
}

/// Install the calibration runner into the checkout unless already present.
pub fn ensure_runner_script(repo: &Path) -> Result<PathBuf, ToolError> {
    let runner = repo.join(RUNNER_FILENAME);
    if runner.exists() {
        return Ok(runner);
    }
    std::fs::write(&runner, RUNNER_SCRIPT).map_err(|e| ToolError::io(&runner, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&runner, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| ToolError::io(&runner, e))?;
    }
    Ok(runner)
}
