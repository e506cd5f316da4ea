mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use cfmv_compute::{compare, impute, Evaluation, ImputeReport};
use cfmv_core::config::load_dotenv;
use cfmv_core::Config;
use cfmv_ingest::{read_dataset, write_dataset};

use crate::cli::{CliArgs, Command, CompareArgs, ImputeArgs};
use crate::config::CliConfig;

fn main() -> Result<()> {
    load_dotenv();

    // Logs go to stderr so `--json` output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let mut config = Config::from_env();
    if let Some(path) = &args.config {
        CliConfig::load(path)?.apply(&mut config)?;
    }
    config.log_summary();

    let summary = match &args.command {
        Command::Impute(a) => {
            let report = run_impute(a, &config)?;
            if args.json {
                json_summary(&config, "report", &report)?
            } else {
                impute_summary(&report, a)
            }
        }
        Command::Compare(a) => {
            let evaluation = run_compare(a, &config)?;
            if args.json {
                json_summary(&config, "evaluation", &evaluation)?
            } else {
                compare_summary(&evaluation)
            }
        }
    };
    println!("{summary}");
    Ok(())
}

fn run_impute(args: &ImputeArgs, config: &Config) -> Result<ImputeReport> {
    let delimiter = config.io.delimiter;
    let mut dataset = read_dataset(&args.input, delimiter)
        .with_context(|| format!("failed to load {}", args.input.display()))?;

    let report = impute(&mut dataset, args.k, config).context("imputation failed")?;

    write_dataset(&args.output, &dataset, delimiter)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(output = %args.output.display(), "imputed data set saved");
    Ok(report)
}

fn run_compare(args: &CompareArgs, config: &Config) -> Result<Evaluation> {
    let delimiter = config.io.delimiter;
    let load = |path: &std::path::Path| {
        read_dataset(path, delimiter).with_context(|| format!("failed to load {}", path.display()))
    };

    let original = load(args.original.as_path())?;
    let incomplete = load(args.incomplete.as_path())?;
    let output = load(args.output.as_path())?;

    compare(&original, &incomplete, &output).context("comparison failed")
}

/// `--json` output: the effective configuration next to the result.
fn json_summary(config: &Config, key: &str, value: &impl Serialize) -> Result<String> {
    let mut out = serde_json::Map::new();
    out.insert("config".to_string(), config.summary());
    out.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(serde_json::to_string_pretty(&out)?)
}

fn impute_summary(report: &ImputeReport, args: &ImputeArgs) -> String {
    let status = if report.converged {
        "converged"
    } else {
        "stopped at iteration cap"
    };
    let mut out = format!(
        "k = {}, {} iterations ({})\ncluster sizes: {:?}\nfilled {} of {} missing cells",
        report.k,
        report.iterations,
        status,
        report.cluster_sizes,
        report.cells_filled,
        report.missing_cells,
    );
    if report.undefined_cells > 0 {
        out.push_str(&format!(", {} left as NaN", report.undefined_cells));
    }
    out.push_str(&format!("\nwritten to {}", args.output.display()));
    out
}

fn compare_summary(evaluation: &Evaluation) -> String {
    format!(
        "exact hits: {} / {}\nhit rate: {:.2}%\naverage relative error: {:.2}%",
        evaluation.exact_hits,
        evaluation.missing_cells,
        evaluation.hit_rate,
        evaluation.average_relative_error,
    )
}
