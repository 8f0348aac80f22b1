//! proturn-impute CLI module
//!
//! Command-line entry point: resolve replicate tables, run the evaluation and
//! append the RMSE to the experiment's result file.

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::{EvaluationConfig, ExperimentType, MaskingLevel};
use crate::data::TableLoader;
use crate::evaluation::{EvaluationReport, Evaluator, ReplicateInput};
use crate::imputation::{RandomSeeds, SeedSource};
use crate::sink::CsvResultSink;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString   { s.truecolor(230, 180, 80) }

fn step_done(msg: &str, detail: &str) {
    println!("  {} {}... {} {}", accent("›"), msg, ok("done"), dim(detail));
}

fn step_skip(msg: &str) {
    println!("  {} {}", warn("!"), msg);
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "proturn-impute")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multiple-imputation RMSE for masked protein turnover data")]
#[command(long_about = None)]
pub struct Cli {
    /// Number of masked values per series (1-4)
    #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
    pub masking_level: u8,

    /// Experiment type
    #[arg(value_enum)]
    pub experiment: ExperimentType,

    /// JSON configuration file; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the proturn_output_* folders
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Imputations per series
    #[arg(short, long)]
    pub repetitions: Option<usize>,

    /// Directory for RMSE result files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Directory for exported imputed tables
    #[arg(long)]
    pub imputed_dir: Option<PathBuf>,

    /// Do not export imputed tables
    #[arg(long)]
    pub no_export: bool,

    /// Impute series in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Worker threads for parallel runs
    #[arg(long)]
    pub threads: Option<usize>,

    /// Seed the repetition seed stream for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Method label written with the result
    #[arg(long)]
    pub label: Option<String>,

    /// Leave series without masked values out of the totals
    #[arg(long)]
    pub exclude_complete: bool,

    /// Also write the full report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl Cli {
    /// Merge the optional config file with command-line flags
    pub fn build_config(&self) -> anyhow::Result<EvaluationConfig> {
        let mut config = match &self.config {
            Some(path) => EvaluationConfig::from_json_file(path)?,
            None => EvaluationConfig::default(),
        };

        config.masking_level = MaskingLevel::new(self.masking_level)?;
        config.experiment = self.experiment;

        if let Some(root) = &self.root {
            config.layout.root = root.clone();
        }
        if let Some(n) = self.repetitions {
            config.repetitions = n;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.imputed_dir {
            config.export.imputed_dir = dir.clone();
        }
        if self.no_export {
            config.export.enabled = false;
        }
        if self.parallel {
            config.parallel = true;
        }
        if let Some(n) = self.threads {
            config.n_threads = Some(n);
        }
        if let Some(label) = &self.label {
            config = config.with_method_label(label.as_str());
        }
        if self.exclude_complete {
            config.exclude_complete_series = true;
        }

        config.validate()?;
        Ok(config)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Run one evaluation and append its RMSE to the result file
pub fn cmd_run(cli: &Cli) -> anyhow::Result<EvaluationReport> {
    let config = cli.build_config()?;
    let mut seeds: Box<dyn SeedSource> = match cli.seed {
        Some(seed) => Box::new(RandomSeeds::seeded(seed)),
        None => Box::new(RandomSeeds::from_entropy()),
    };

    section(&format!(
        "Evaluate  {}  masked={}",
        config.experiment, config.masking_level
    ));

    let evaluator = Evaluator::from_config(config.clone())?;

    // Step lines are printed whole once the step ends
    let start = Instant::now();
    let replicates = evaluator.load_replicates(&TableLoader::new());
    let loaded = replicates
        .iter()
        .filter(|r| matches!(r, ReplicateInput::Loaded(_)))
        .count();
    step_done(
        "Loading replicates",
        &format!("{}/{} in {:?}", loaded, replicates.len(), start.elapsed()),
    );

    let report = evaluator.evaluate(replicates, seeds.as_mut())?;
    step_done(
        &format!("Imputing ({} repetitions)", config.repetitions),
        &format!("{:.2}s", report.elapsed_secs),
    );

    for skipped in &report.skipped_replicates {
        step_skip(&format!("skipped replicate {}: {}", skipped.replicate, skipped.reason));
    }
    for skipped in &report.skipped_series {
        step_skip(&format!(
            "skipped series {}/{}: {}",
            skipped.replicate, skipped.series_id, skipped.reason
        ));
    }

    println!();
    for replicate in &report.replicates {
        println!(
            "  {:<16} {} {}",
            muted(&replicate.replicate),
            format!("{:.6}", replicate.totals.squared_error()).white(),
            dim(&format!(
                "({} rows, {} series)",
                replicate.totals.observations(),
                replicate.series_scored
            )),
        );
    }

    let mut sink = CsvResultSink::for_experiment(&config.output_dir, config.experiment);
    report.record(&mut sink)?;

    if let Some(path) = &cli.report {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, report.to_json()?)?;
    }

    println!();
    println!("  {:<16} {}", muted("RMSE"), format!("{:.6}", report.rmse()).white().bold());
    println!("  {:<16} {}", muted("Observations"), report.result.total_observations.to_string().white());
    println!("  {:<16} {}", muted("Saved to"), sink.path().display().to_string().white());
    if let Some(path) = &cli.report {
        println!("  {:<16} {}", muted("Report"), path.display().to_string().white());
    }
    println!();

    Ok(report)
}
