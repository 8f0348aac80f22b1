//! RMSE result records

use crate::config::ExperimentType;
use crate::error::Result;
use crate::evaluation::RmseResult;
use crate::sink::ResultSink;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends `rmse, masking_level, method_label` lines to a text file
#[derive(Debug, Clone)]
pub struct CsvResultSink {
    path: PathBuf,
}

impl CsvResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `{output_dir}/rmse_{experiment}.csv`
    pub fn for_experiment(output_dir: &Path, experiment: ExperimentType) -> Self {
        Self::new(output_dir.join(format!("rmse_{}.csv", experiment)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Line written for one result
    pub fn format_record(result: &RmseResult) -> String {
        format!(
            "{}, {}, {}\n",
            result.rmse, result.masking_level, result.method_label
        )
    }
}

impl ResultSink for CsvResultSink {
    fn append(&mut self, result: &RmseResult) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(Self::format_record(result).as_bytes())?;
        Ok(())
    }
}

/// In-memory result sink
#[derive(Debug, Clone, Default)]
pub struct MemoryResultSink {
    records: Vec<RmseResult>,
}

impl MemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[RmseResult] {
        &self.records
    }
}

impl ResultSink for MemoryResultSink {
    fn append(&mut self, result: &RmseResult) -> Result<()> {
        self.records.push(result.clone());
        Ok(())
    }
}
