//! screen-report: run FDR-corrected screens and score calibration from a JSON document.
//!
//! Reads an analysis document (hypothesis tests, dependency comparisons and/or
//! calibration inputs), runs every section present and writes a JSON report.
//!
//! Usage:
//!   cargo run -p screen-report -- --input screen.json
//!   cargo run -p screen-report -- --input screen.json --output report.json --alpha 0.05
//!   cargo run -p screen-report -- --input scores.json --no-calibration

mod config;
mod report;

use anyhow::{Context, Result};
use config::ReportConfig;
use report::{build_report, AnalysisInput};

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  screen-report --input PATH             Analysis document (or SCREEN_INPUT)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --output PATH          Write report here instead of stdout (or SCREEN_OUTPUT)");
    eprintln!("  --alpha A              FDR level (default 0.10, or SCREEN_ALPHA)");
    eprintln!("  --direction D          negative|positive hypothesized effect (SCREEN_DIRECTION)");
    eprintln!("  --min-group-size N     Minimum finite scores per group (SCREEN_MIN_GROUP_SIZE)");
    eprintln!("  --threshold T          Classification threshold (CLASSIFICATION_THRESHOLD)");
    eprintln!("  --tolerance E          Clamp raw scores this far outside [0, 1] (CALIBRATION_TOLERANCE)");
    eprintln!("  --no-calibration       Use raw scores as probabilities");
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "screen_report=info,multiple_testing=warn,confidence_calibrator=warn".into()
            }),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = ReportConfig::from_env().context("reading configuration from environment")?;
    config.apply_args(&args)?;

    let input_path = match &config.input {
        Some(path) => path.clone(),
        None => {
            print_usage();
            anyhow::bail!("no input: pass --input or set SCREEN_INPUT");
        }
    };

    tracing::info!("Reading analysis input from {}", input_path.display());
    let raw = std::fs::read_to_string(&input_path)
        .with_context(|| format!("reading {}", input_path.display()))?;
    let input: AnalysisInput = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", input_path.display()))?;

    let report = build_report(&input, &config)?;
    let rendered = serde_json::to_string_pretty(&report)?;

    match &config.output {
        Some(path) => {
            std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
