//! Sub-command handlers of `modelscope-manage`.
//!
//! Handlers print their user-facing report lines to stdout and return the
//! process exit code. Diagnostics go through `tracing`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::warn;

use super::calibrate::{ensure_runner_script, write_default_calib, CalibrationOverrides, CalibrationPlan};
use super::download::{download_model, SnapshotDownloader};
use super::launcher::{run_checked, ProcessLauncher};
use super::metadata::{metadata_path, write_snapshot_metadata};
use super::paths::{normalize_model_id, CacheLayout, VolumeKind};
use super::snapshot::{clean_cache_root, locate_snapshot, synthesize_transformer_files, SnapshotInfo};
use super::volume::{ensure_volume, remove_volume, ContainerRuntime};
use crate::builders::{build_calibration_command, build_clone_command, build_dependency_steps, build_serve_command};
use crate::config::{apply_offline_defaults, ProfileBook};
use crate::core::{AppResult, ToolError};
use crate::runtime::Invocation;
use crate::util::{absolutize, expand_user, utc_now};

const LOAD_CHECK_SCRIPT: &str = include_str!("scripts/load_check.py");

/// Options of `serve`.
#[derive(Debug, Clone, Default, Args)]
pub struct ServeOptions {
    /// Profile name from the profiles file.
    #[arg(long)]
    pub profile: String,
    /// Print the command before execution.
    #[arg(long)]
    pub print_command: bool,
    /// Only print the command and exit.
    #[arg(long)]
    pub dry_run: bool,
    /// Additional argument (repeatable), shell-split.
    #[arg(long = "extra-arg", allow_hyphen_values = true)]
    pub extra_args: Vec<String>,
    /// Environment override KEY=VALUE (repeatable).
    #[arg(long = "env")]
    pub env: Vec<String>,
}

/// Model selection shared by the cache sub-commands.
#[derive(Debug, Clone, Default, Args)]
pub struct ModelTarget {
    /// ModelScope model identifier, e.g. `Qwen/Qwen2.5-7B-Instruct`.
    pub model_id: String,
    /// Override the cache root for this model.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

/// Options of `install`.
#[derive(Debug, Clone, Default, Args)]
pub struct InstallOptions {
    /// Model to install.
    #[command(flatten)]
    pub target: ModelTarget,
    /// Skip the model Podman volume.
    #[arg(long)]
    pub no_volume: bool,
    /// Skip the KV Podman volume and KV directory.
    #[arg(long)]
    pub no_kv_volume: bool,
}

/// Options of `delete`.
#[derive(Debug, Clone, Default, Args)]
pub struct DeleteOptions {
    /// Model to delete.
    #[command(flatten)]
    pub target: ModelTarget,
    /// Do not ask for confirmation.
    #[arg(long)]
    pub force: bool,
    /// Also remove the model Podman volume.
    #[arg(long)]
    pub remove_volume: bool,
    /// Also remove KV data and the KV Podman volume.
    #[arg(long)]
    pub remove_kv: bool,
}

/// Options of `kv-calibrate`.
#[derive(Debug, Clone, Default, Args)]
pub struct KvCalibrateOptions {
    /// Profile with a `kv_calibration` section.
    #[arg(long, conflicts_with = "model")]
    pub profile: Option<String>,
    /// ModelScope model identifier for ad-hoc calibration.
    #[arg(long)]
    pub model: Option<String>,
    /// Recalibrate even when the output exists.
    #[arg(long)]
    pub force: bool,
    /// Skip pip dependency installation.
    #[arg(long)]
    pub skip_deps: bool,
    /// Skip Podman volume creation.
    #[arg(long)]
    pub no_volumes: bool,
    /// Scales output file.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Calibration JSONL file.
    #[arg(long)]
    pub calib_data: Option<PathBuf>,
    /// Number of calibration samples.
    #[arg(long)]
    pub samples: Option<u32>,
    /// Calibration sequence length.
    #[arg(long)]
    pub seq_len: Option<u32>,
    /// Template for synthesized samples; `{i}` is the sample index.
    #[arg(long)]
    pub dataset_prompt: Option<String>,
    /// Snapshot cache directory.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
    /// llm-compressor checkout.
    #[arg(long)]
    pub llm_compressor_repo: Option<PathBuf>,
    /// Quantization script relative to the checkout.
    #[arg(long)]
    pub quant_script: Option<String>,
    /// Extra quantization script argument (repeatable).
    #[arg(long = "quant-arg", allow_hyphen_values = true)]
    pub quant_args: Vec<String>,
}

impl KvCalibrateOptions {
    fn overrides(&self) -> CalibrationOverrides {
        CalibrationOverrides {
            output: self.output.clone(),
            calib_data: self.calib_data.clone(),
            samples: self.samples,
            seq_len: self.seq_len,
            dataset_prompt: self.dataset_prompt.clone(),
            cache_dir: self.cache_dir.clone(),
            llm_compressor_repo: self.llm_compressor_repo.clone(),
            quant_script: self.quant_script.clone(),
            quant_args: self.quant_args.clone(),
        }
    }
}

/// Model cache manager over injectable download, container and process seams.
pub struct ModelManager<D, C, L> {
    layout: CacheLayout,
    python: String,
    process_env: BTreeMap<String, String>,
    downloader: D,
    containers: C,
    launcher: L,
}

impl<D, C, L> ModelManager<D, C, L>
where
    D: SnapshotDownloader,
    C: ContainerRuntime,
    L: ProcessLauncher,
{
    /// Create a manager. The process environment is captured now.
    pub fn new(layout: CacheLayout, python: impl Into<String>, downloader: D, containers: C, launcher: L) -> Self {
        Self {
            layout,
            python: python.into(),
            process_env: std::env::vars().collect(),
            downloader,
            containers,
            launcher,
        }
    }

    /// Replace the captured process environment.
    #[must_use]
    pub fn with_process_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.process_env = env;
        self
    }

    /// Cache layout in use.
    pub const fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    fn cache_root(&self, target: &ModelTarget) -> (String, PathBuf) {
        let model_id = normalize_model_id(&target.model_id);
        let root = target
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.layout.model_cache_root(&model_id));
        (model_id, absolutize(&expand_user(&root)))
    }

    /// `serve`: launch the inference server for a profile.
    pub async fn serve(&self, book: &ProfileBook, opts: &ServeOptions) -> AppResult<u8> {
        let profile = book.ensure(&opts.profile)?;
        let command = build_serve_command(profile, &opts.extra_args, &opts.env, &self.process_env, &self.layout)?;
        let invocation = command.invocation()?;
        if opts.print_command || opts.dry_run {
            println!("{}", invocation.display_line());
        }
        if opts.dry_run {
            return Ok(0);
        }
        run_checked(&self.launcher, &invocation).await?;
        Ok(0)
    }

    /// `install`: download and prepare a snapshot.
    pub async fn install(&self, opts: &InstallOptions) -> AppResult<u8> {
        let (model_id, cache_root) = self.cache_root(&opts.target);
        let model_volume = VolumeKind::Model.volume_name(&model_id);
        let kv_volume = VolumeKind::Kv.volume_name(&model_id);
        if !opts.no_volume {
            ensure_volume(&self.containers, &model_volume).await;
        }
        if !opts.no_kv_volume {
            ensure_volume(&self.containers, &kv_volume).await;
        }

        let model_dir = download_model(&self.downloader, &model_id, &cache_root).await?;
        synthesize_transformer_files(&model_dir)?;
        write_snapshot_metadata(&cache_root, &model_id, &model_dir, utc_now())?;
        let kv_root = self.layout.kv_model_root(&model_id);
        if !opts.no_kv_volume {
            std::fs::create_dir_all(&kv_root).map_err(|e| ToolError::io(&kv_root, e))?;
        }

        println!("[install] snapshot ready -> {}", model_dir.display());
        if !opts.no_volume {
            println!("[install] podman mount suggestion: -v {model_volume}:{}:U", cache_root.display());
        }
        if !opts.no_kv_volume {
            println!("[install] podman mount suggestion: -v {kv_volume}:{}:U", kv_root.display());
        }
        Ok(0)
    }

    /// `info`: print snapshot details. Exit 1 when no snapshot exists.
    pub fn info(&self, target: &ModelTarget) -> u8 {
        let (model_id, cache_root) = self.cache_root(target);
        let Some(snapshot) = locate_snapshot(&cache_root) else {
            println!("[info] snapshot missing for {model_id} in {}", cache_root.display());
            return 1;
        };
        for line in SnapshotInfo::collect(&model_id, &cache_root, Some(&snapshot)).lines() {
            println!("{line}");
        }
        0
    }

    /// `check`: print details and load the snapshot offline with Transformers.
    pub async fn check(&self, target: &ModelTarget) -> AppResult<u8> {
        let (model_id, cache_root) = self.cache_root(target);
        let Some(snapshot) = locate_snapshot(&cache_root) else {
            println!("[check] snapshot missing for {model_id}");
            return Ok(1);
        };
        for line in SnapshotInfo::collect(&model_id, &cache_root, Some(&snapshot)).lines() {
            println!("{line}");
        }
        let mut env = self.process_env.clone();
        apply_offline_defaults(&mut env, &cache_root, &self.layout.hf_home, &self.layout.home);
        let probe = Invocation::new(
            &self.python,
            ["-c".to_string(), LOAD_CHECK_SCRIPT.to_string(), snapshot.display().to_string()],
        )
        .with_env(env);
        run_checked(&self.launcher, &probe).await?;
        Ok(0)
    }

    /// `delete`: remove a cache root, optionally with volumes and KV data.
    ///
    /// `confirm` is asked before removal unless `--force` is given.
    pub async fn delete<F>(&self, opts: &DeleteOptions, confirm: F) -> AppResult<u8>
    where
        F: FnOnce(&Path) -> bool + Send,
    {
        let (model_id, cache_root) = self.cache_root(&opts.target);
        if cache_root.exists() {
            if !opts.force && !confirm(&cache_root) {
                println!("[delete] cancelled");
                return Ok(1);
            }
            clean_cache_root(&cache_root)?;
            println!("[delete] removed cache root -> {}", cache_root.display());
        } else {
            println!("[delete] cache root missing -> {}", cache_root.display());
        }

        let meta = metadata_path(&cache_root);
        if meta.exists() {
            std::fs::remove_file(&meta).map_err(|e| ToolError::io(&meta, e))?;
        }
        if opts.remove_volume {
            remove_volume(&self.containers, &VolumeKind::Model.volume_name(&model_id)).await;
        }
        if opts.remove_kv {
            let kv_root = self.layout.kv_model_root(&model_id);
            if kv_root.exists() {
                clean_cache_root(&kv_root)?;
                println!("[delete] removed kv data -> {}", kv_root.display());
            }
            remove_volume(&self.containers, &VolumeKind::Kv.volume_name(&model_id)).await;
        }
        Ok(0)
    }

    /// `kv-calibrate`: produce KV-cache scales for a model.
    pub async fn kv_calibrate(&self, book: Option<&ProfileBook>, opts: &KvCalibrateOptions) -> AppResult<u8> {
        let overrides = opts.overrides();
        let plan = match (&opts.profile, &opts.model) {
            (Some(name), _) => {
                let book = book.ok_or_else(|| ToolError::Config("kv-calibrate --profile requires a profiles file".into()))?;
                let profile = book.ensure(name)?;
                let env_cache = self.process_env.get("MODELSCOPE_CACHE").map(String::as_str);
                CalibrationPlan::from_profile(name, profile.kv_calibration.as_ref(), &overrides, &self.layout, env_cache)?
            }
            (None, Some(model)) => CalibrationPlan::adhoc(model, &overrides, &self.layout)?,
            (None, None) => return Err(ToolError::Config("kv-calibrate requires --profile or --model".into()).into()),
        };

        if !opts.no_volumes {
            ensure_volume(&self.containers, &VolumeKind::Model.volume_name(&plan.model_id)).await;
            ensure_volume(&self.containers, &VolumeKind::Kv.volume_name(&plan.model_id)).await;
        }

        if let Some(parent) = plan.output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ToolError::io(parent, e))?;
        }
        if plan.output.exists() && !opts.force {
            println!("[kv-calibrate] reuse existing scales -> {}", plan.output.display());
            return Ok(0);
        }
        if !plan.calib_data.exists() {
            write_default_calib(&plan.calib_data, plan.samples, &plan.dataset_prompt)?;
        }

        let model_dir = download_model(&self.downloader, &plan.model_id, &plan.cache_dir).await?;
        synthesize_transformer_files(&model_dir)?;
        write_snapshot_metadata(&plan.cache_dir, &plan.model_id, &model_dir, utc_now())?;

        let repo = &plan.llm_compressor_repo;
        if !repo.exists() {
            if let Some(parent) = repo.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ToolError::io(parent, e))?;
            }
            println!("[kv-calibrate] cloning llm-compressor into {}", repo.display());
            run_checked(&self.launcher, &build_clone_command(repo)).await?;
        }
        let runner = ensure_runner_script(repo)?;

        if !opts.skip_deps {
            for step in build_dependency_steps(&self.python, repo) {
                if step.checked {
                    run_checked(&self.launcher, &step.invocation).await?;
                } else {
                    self.launcher.launch(&step.invocation).await?;
                }
            }
        }

        let quant_script = plan.quant_script_path();
        if !quant_script.exists() {
            return Err(ToolError::NotFound {
                what: "Quantization script",
                path: quant_script,
            }
            .into());
        }

        let command = build_calibration_command(
            &self.python,
            &runner,
            &quant_script,
            &model_dir,
            &plan,
            self.calibration_env(&plan.cache_dir),
        );
        run_checked(&self.launcher, &command).await?;
        println!("[kv-calibrate] completed -> {}", plan.output.display());
        Ok(0)
    }

    fn calibration_env(&self, cache_dir: &Path) -> BTreeMap<String, String> {
        let mut env = self.process_env.clone();
        let cache = cache_dir.display().to_string();
        env.insert("MODELSCOPE_CACHE".into(), cache.clone());
        env.insert("MODELSCOPE_HOME".into(), cache);
        apply_offline_defaults(&mut env, cache_dir, &self.layout.hf_home, &self.layout.home);
        for key in ["HF_HOME", "TRANSFORMERS_CACHE", "HF_DATASETS_CACHE"] {
            if let Some(dir) = env.get(key) {
                if let Err(err) = std::fs::create_dir_all(dir) {
                    warn!(key, dir = %dir, error = %err, "cache directory not created");
                }
            }
        }
        env
    }
}

/// `list`: `name: description` lines sorted by profile name.
pub fn list_profiles(book: &ProfileBook) -> Vec<String> {
    book.summaries()
        .into_iter()
        .map(|(name, description)| format!("{name}: {description}"))
        .collect()
}
