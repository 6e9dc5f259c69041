//! `modelscope-manage`: ModelScope model cache and KV calibration CLI.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use vllm_extras::config::{load_dotenv, ProfileBook};
use vllm_extras::core::AppResult;
use vllm_extras::modelscope::{
    list_profiles, CacheLayout, DeleteOptions, InstallOptions, KvCalibrateOptions, ModelManager, ModelScopeSdk,
    ModelTarget, PodmanCli, ServeOptions, SystemLauncher,
};
use vllm_extras::util::init_tracing;

/// Manage ModelScope models for vLLM: serve profiles, snapshots and KV-cache
/// calibration.
#[derive(Debug, Parser)]
#[command(name = "modelscope-manage", version, about, long_about = None)]
struct Cli {
    /// Model profiles YAML.
    #[arg(long, global = true, env = "VLLM_EXTRAS_PROFILES", default_value = "model_profiles.yaml")]
    config: PathBuf,

    /// Python interpreter for downloads, checks and calibration.
    #[arg(long, global = true, env = "VLLM_EXTRAS_PYTHON", default_value = "python3")]
    python: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Launch the vLLM API server for a profile.
    Serve(ServeOptions),
    /// Download a snapshot and prepare it for offline use.
    Install(InstallOptions),
    /// Show snapshot details.
    Info(ModelTarget),
    /// Show details and load the snapshot with Transformers.
    Check(ModelTarget),
    /// Remove a snapshot.
    Delete(DeleteOptions),
    /// Produce KV-cache scales with llm-compressor.
    KvCalibrate(KvCalibrateOptions),
    /// List profiles.
    List,
}

fn confirm_removal(path: &Path) -> bool {
    Confirm::new()
        .with_prompt(format!("Remove snapshot at {}?", path.display()))
        .default(false)
        .interact()
        .unwrap_or(false)
}

async fn run(cli: Cli) -> AppResult<u8> {
    let manager = ModelManager::new(
        CacheLayout::discover()?,
        cli.python.clone(),
        ModelScopeSdk::new(cli.python.clone()),
        PodmanCli::default(),
        SystemLauncher,
    );
    match &cli.command {
        Command::Serve(opts) => manager.serve(&ProfileBook::load(&cli.config)?, opts).await,
        Command::Install(opts) => manager.install(opts).await,
        Command::Info(target) => Ok(manager.info(target)),
        Command::Check(target) => manager.check(target).await,
        Command::Delete(opts) => manager.delete(opts, confirm_removal).await,
        Command::KvCalibrate(opts) => {
            let book = opts.profile.as_ref().map(|_| ProfileBook::load(&cli.config)).transpose()?;
            manager.kv_calibrate(book.as_ref(), opts).await
        }
        Command::List => {
            for line in list_profiles(&ProfileBook::load(&cli.config)?) {
                println!("{line}");
            }
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    init_tracing("info");
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
