use anyhow::{Context, Result};
use clap::Parser;
use screener::cli::{Cli, OutputFormat};
use screener::qc::{run_gate, GateReport};
use screener::trial;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn render(report: &GateReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report.to_report_string()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize gate report")
        }
        OutputFormat::Html => Ok(format!("{}\n", report.narrative())),
    }
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = args.quality_config()?;
    let trials = trial::load_trial_log(&args.trials)?;
    tracing::debug!(
        path = %args.trials.display(),
        trials = trials.len(),
        "loaded practice trials"
    );

    let report = run_gate(&trials, &config)
        .with_context(|| format!("Quality control failed for {}", args.trials.display()))?;

    print!("{}", render(&report, args.format)?);
    if args.format == OutputFormat::Json {
        println!();
    }

    if report.all_passed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}
