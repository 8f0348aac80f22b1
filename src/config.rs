//! Evaluation configuration

use crate::data::ReplicatePaths;
use crate::error::{ImputeError, Result};
use crate::imputation::IterativeImputerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Number of values masked per series (1 to 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MaskingLevel(u8);

impl MaskingLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(level: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ImputeError::InvalidParameter {
                name: "masking_level".to_string(),
                value: level.to_string(),
                reason: format!("must be between {} and {}", Self::MIN, Self::MAX),
            })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for MaskingLevel {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u8> for MaskingLevel {
    type Error = ImputeError;

    fn try_from(level: u8) -> Result<Self> {
        Self::new(level)
    }
}

impl From<MaskingLevel> for u8 {
    fn from(level: MaskingLevel) -> Self {
        level.0
    }
}

impl fmt::Display for MaskingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Experiment group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentType {
    /// Control group
    #[default]
    Ctrl,
    /// Isotope-labelled group
    Iso,
}

impl ExperimentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperimentType::Ctrl => "ctrl",
            ExperimentType::Iso => "iso",
        }
    }
}

impl fmt::Display for ExperimentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperimentType {
    type Err = ImputeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ctrl" => Ok(ExperimentType::Ctrl),
            "iso" => Ok(ExperimentType::Iso),
            other => Err(ImputeError::InvalidParameter {
                name: "experiment".to_string(),
                value: other.to_string(),
                reason: "expected one of: ctrl, iso".to_string(),
            }),
        }
    }
}

/// On-disk layout of replicate tables.
///
/// Masked table: `{root}/{prefix}{strain}_{experiment}/{masked_template}` with
/// `{level}` substituted. True table: same directory, `true_file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateLayout {
    /// Directory holding the per-strain output folders
    pub root: PathBuf,
    /// Folder name prefix
    pub prefix: String,
    /// Replicate (strain) names
    pub strains: Vec<String>,
    /// Masked table file name, `{level}` is replaced by the masking level
    pub masked_template: String,
    /// True table file name
    pub true_file: String,
}

impl Default for ReplicateLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            prefix: "proturn_output_".to_string(),
            strains: ["aj", "balbc", "c57", "cej", "dba", "fvb"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            masked_template: "hl-data_masked_{level}.csv".to_string(),
            true_file: "hl-data_filtered.csv".to_string(),
        }
    }
}

impl ReplicateLayout {
    /// Directory of one strain's tables
    pub fn replicate_dir(&self, strain: &str, experiment: ExperimentType) -> PathBuf {
        self.root
            .join(format!("{}{}_{}", self.prefix, strain, experiment))
    }

    /// Masked and true table locations of one strain
    pub fn resolve(&self, strain: &str, experiment: ExperimentType, level: MaskingLevel) -> ReplicatePaths {
        let dir = self.replicate_dir(strain, experiment);
        let masked_name = self.masked_template.replace("{level}", &level.to_string());
        ReplicatePaths {
            name: strain.to_string(),
            masked: dir.join(masked_name),
            truth: dir.join(&self.true_file),
        }
    }

    /// Table locations of every configured strain, in order
    pub fn resolve_all(&self, experiment: ExperimentType, level: MaskingLevel) -> Vec<ReplicatePaths> {
        self.strains
            .iter()
            .map(|strain| self.resolve(strain, experiment, level))
            .collect()
    }
}

/// Export of intermediate imputed tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub enabled: bool,
    /// Root directory of exported tables
    pub imputed_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            imputed_dir: PathBuf::from("dmi_imputed_data"),
        }
    }
}

/// Configuration for one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Values masked per series
    pub masking_level: MaskingLevel,

    /// Experiment group
    pub experiment: ExperimentType,

    /// Where replicate tables live
    pub layout: ReplicateLayout,

    /// Imputations per series
    pub repetitions: usize,

    /// Method label written with each result
    pub method_label: String,

    /// Imputer settings
    pub imputer: IterativeImputerConfig,

    /// Intermediate table export
    pub export: ExportConfig,

    /// Directory of the RMSE result files
    pub output_dir: PathBuf,

    /// Run series on the rayon pool
    pub parallel: bool,

    /// Also run repetitions of one series in parallel
    pub parallel_repetitions: bool,

    /// Worker threads (None = rayon default)
    pub n_threads: Option<usize>,

    /// Skip series without masked values so they add neither error nor
    /// observations
    pub exclude_complete_series: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            masking_level: MaskingLevel::default(),
            experiment: ExperimentType::default(),
            layout: ReplicateLayout::default(),
            repetitions: 10,
            method_label: "dmi_bayesian_ridge".to_string(),
            imputer: IterativeImputerConfig::default(),
            export: ExportConfig::default(),
            output_dir: PathBuf::from("rmse"),
            parallel: false,
            parallel_repetitions: false,
            n_threads: None,
            exclude_complete_series: false,
        }
    }
}

impl EvaluationConfig {
    pub fn new(masking_level: MaskingLevel, experiment: ExperimentType) -> Self {
        Self {
            masking_level,
            experiment,
            ..Self::default()
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.layout.root = root.into();
        self
    }

    pub fn with_repetitions(mut self, n: usize) -> Self {
        self.repetitions = n;
        self
    }

    pub fn with_method_label(mut self, label: impl Into<String>) -> Self {
        self.method_label = label.into();
        self
    }

    pub fn with_export(mut self, enabled: bool) -> Self {
        self.export.enabled = enabled;
        self
    }

    pub fn with_imputed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export.imputed_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = Some(n);
        self
    }

    pub fn with_exclude_complete_series(mut self, exclude: bool) -> Self {
        self.exclude_complete_series = exclude;
        self
    }

    /// Result file of this run
    pub fn result_path(&self) -> PathBuf {
        self.output_dir.join(format!("rmse_{}.csv", self.experiment))
    }

    pub fn validate(&self) -> Result<()> {
        if self.repetitions == 0 {
            return Err(ImputeError::InvalidParameter {
                name: "repetitions".to_string(),
                value: "0".to_string(),
                reason: "at least one repetition is required".to_string(),
            });
        }
        if self.imputer.max_iter == 0 {
            return Err(ImputeError::InvalidParameter {
                name: "imputer.max_iter".to_string(),
                value: "0".to_string(),
                reason: "at least one pass is required".to_string(),
            });
        }
        if self.n_threads == Some(0) {
            return Err(ImputeError::InvalidParameter {
                name: "n_threads".to_string(),
                value: "0".to_string(),
                reason: "use null for the rayon default".to_string(),
            });
        }
        if self.method_label.trim().is_empty() {
            return Err(ImputeError::ConfigError(
                "method_label must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
