//! `compare-results`: diff a baseline and a patched results file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use vllm_extras::config::load_dotenv;
use vllm_extras::core::{compare, load_results, AppResult};
use vllm_extras::util::init_tracing;

/// Compare baseline vs patched test results.
#[derive(Debug, Parser)]
#[command(name = "compare-results", version, about, long_about = None)]
struct Cli {
    /// Baseline results JSON.
    #[arg(long)]
    baseline: PathBuf,

    /// Patched results JSON.
    #[arg(long)]
    patched: PathBuf,

    /// Exit with status 1 when regressions are detected.
    #[arg(long)]
    fail_on_regression: bool,
}

fn run(cli: &Cli) -> AppResult<usize> {
    let baseline = load_results(&cli.baseline)?;
    let patched = load_results(&cli.patched)?;
    let comparison = compare(&baseline, &patched);
    for entry in &comparison.entries {
        println!("{entry}");
    }
    println!("{}", comparison.summary_line());
    Ok(comparison.regressions())
}

fn main() -> ExitCode {
    load_dotenv();
    init_tracing("warn");
    let cli = Cli::parse();
    match run(&cli) {
        Ok(regressions) if regressions > 0 && cli.fail_on_regression => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
