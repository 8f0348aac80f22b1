//! CSV loading for replicate tables

use crate::data::table::{MeasurementTable, ReplicateDataset, ID_COLUMN, TIME_COLUMN, VALUE_COLUMN};
use crate::error::{ImputeError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Locations of one replicate's masked and true tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicatePaths {
    /// Replicate (strain) name
    pub name: String,
    pub masked: PathBuf,
    pub truth: PathBuf,
}

/// Fixed types of the measured columns, whatever the first rows look like
fn measurement_schema() -> SchemaRef {
    Arc::new(Schema::from_iter([
        Field::new(ID_COLUMN.into(), DataType::String),
        Field::new(TIME_COLUMN.into(), DataType::Float64),
        Field::new(VALUE_COLUMN.into(), DataType::Float64),
    ]))
}

/// Loads measurement tables from CSV files
#[derive(Debug, Clone)]
pub struct TableLoader {
    /// Rows used for schema inference of extra columns
    infer_schema_length: Option<usize>,
}

impl Default for TableLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
        }
    }

    /// Set schema inference length (`None` scans the whole file)
    pub fn with_infer_schema_length(mut self, n: Option<usize>) -> Self {
        self.infer_schema_length = n;
        self
    }

    /// Load one table.
    ///
    /// A file that does not exist yields [`ImputeError::MissingFile`]; any
    /// other read, parse or schema failure yields
    /// [`ImputeError::MalformedTable`].
    pub fn load_table(&self, path: &Path) -> Result<MeasurementTable> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ImputeError::MissingFile {
                path: path.to_path_buf(),
            },
            _ => ImputeError::MalformedTable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        let malformed = |e: ImputeError| ImputeError::MalformedTable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_schema_overwrite(Some(measurement_schema()))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| malformed(e.into()))?;

        let table = MeasurementTable::from_dataframe(&df).map_err(malformed)?;
        debug!(path = %path.display(), rows = table.len(), "Loaded table");
        Ok(table)
    }

    /// Load both tables of a replicate
    pub fn load_replicate(&self, paths: &ReplicatePaths) -> Result<ReplicateDataset> {
        let masked = self.load_table(&paths.masked)?;
        let truth = self.load_table(&paths.truth)?;
        Ok(ReplicateDataset::new(paths.name.clone(), masked, truth))
    }
}
