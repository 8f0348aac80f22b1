//! CSV export of imputed series

use crate::data::{TIME_COLUMN, TIME_COL, VALUE_COLUMN, VALUE_COL};
use crate::error::{ImputeError, Result};
use crate::sink::{ImputedSink, SinkContext};
use ndarray::Array2;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::PathBuf;

/// Writes `{root}/{replicate}/{series}/imputed_data_{repetition}.csv`
#[derive(Debug, Clone)]
pub struct CsvImputedSink {
    root: PathBuf,
}

impl CsvImputedSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Target file for one repetition
    pub fn path_for(&self, repetition: usize, context: &SinkContext) -> PathBuf {
        self.root
            .join(path_component(&context.replicate))
            .join(path_component(&context.series))
            .join(format!("imputed_data_{}.csv", repetition))
    }
}

/// Replace characters that are unsafe in a single path component
fn path_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

impl ImputedSink for CsvImputedSink {
    fn write(&self, table: &Array2<f64>, repetition: usize, context: &SinkContext) -> Result<()> {
        if table.ncols() <= VALUE_COL {
            return Err(ImputeError::ShapeError {
                expected: "[t, A0] columns".to_string(),
                actual: format!("{} columns", table.ncols()),
            });
        }

        let path = self.path_for(repetition, context);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let times: Vec<f64> = table.column(TIME_COL).to_vec();
        let values: Vec<f64> = table.column(VALUE_COL).to_vec();
        let mut df = DataFrame::new(vec![
            Series::new(TIME_COLUMN.into(), times),
            Series::new(VALUE_COLUMN.into(), values),
        ])?;

        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)?;

        Ok(())
    }
}
