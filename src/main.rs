//! proturn-impute - Main Entry Point
//!
//! Evaluates multiple imputation on masked turnover data and records the RMSE.

use clap::Parser;
use proturn_impute::cli::{cmd_run, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proturn_impute=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let report = cmd_run(&cli)?;

    println!(
        "RMSE for n_masked={}, exp_type={}: {}",
        report.result.masking_level, report.result.experiment, report.rmse()
    );

    Ok(())
}
