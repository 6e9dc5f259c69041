//! ModelScope model cache management: snapshot download and repair, Podman
//! volumes, metadata and KV-cache calibration.

pub mod calibrate;
pub mod download;
pub mod launcher;
pub mod manager;
pub mod metadata;
pub mod paths;
pub mod snapshot;
pub mod volume;

pub use calibrate::{
    ensure_runner_script, render_prompt, write_default_calib, CalibrationOverrides, CalibrationPlan,
    DEFAULT_DATASET_PROMPT, DEFAULT_QUANT_SCRIPT, DEFAULT_SAMPLES, DEFAULT_SEQ_LEN, RUNNER_FILENAME,
};
pub use download::{download_model, parse_snapshot_marker, ModelScopeSdk, SnapshotDownloader};
pub use launcher::{run_checked, ProcessLauncher, SystemLauncher};
pub use manager::{
    list_profiles, DeleteOptions, InstallOptions, KvCalibrateOptions, ModelManager, ModelTarget, ServeOptions,
};
pub use metadata::{metadata_path, read_snapshot_metadata, write_snapshot_metadata, SnapshotMetadata, METADATA_FILENAME};
pub use paths::{normalize_model_id, safe_model_key, CacheLayout, VolumeKind, KV_CACHE_FILENAME};
pub use snapshot::{
    clean_cache_root, disk_usage_bytes, locate_snapshot, normalize_tokenizer_artifacts, resolve_model_root,
    sanitize_config_for_offline, synthesize_transformer_files, SnapshotInfo, SynthesisReport,
};
pub use volume::{ensure_volume, remove_volume, ContainerRuntime, PodmanCli, VolumeAction, VolumeError};
