//! `validate-env`: CUDA / PyTorch / vLLM smoke tests.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use vllm_extras::config::load_dotenv;
use vllm_extras::core::{AppResult, ShellRunner};
use vllm_extras::envcheck::run_checks;
use vllm_extras::util::init_tracing;

/// Validate a CUDA, PyTorch and vLLM environment for sm_120 builds.
#[derive(Debug, Parser)]
#[command(name = "validate-env", version, about, long_about = None)]
struct Cli {
    /// Only run the PyTorch and vLLM probes.
    #[arg(long)]
    quick: bool,

    /// Emit the report as JSON.
    #[arg(long)]
    json: bool,

    /// Python interpreter used for the probes.
    #[arg(long, env = "VLLM_EXTRAS_PYTHON", default_value = "python3")]
    python: String,
}

async fn run(cli: &Cli) -> AppResult<bool> {
    let runner = ShellRunner::new();
    let report = run_checks(&runner, &cli.python, cli.quick, |key| std::env::var(key).ok()).await;
    if cli.json {
        let rendered = serde_json::to_string_pretty(&report).context("rendering report")?;
        println!("{rendered}");
    } else {
        for line in report.lines() {
            println!("{line}");
        }
    }
    Ok(report.all_passed())
}

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    init_tracing("warn");
    let cli = Cli::parse();
    match run(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
