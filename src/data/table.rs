//! Measurement tables and replicate datasets

use crate::error::{ImputeError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Series identifier column
pub const ID_COLUMN: &str = "ID";
/// Time column
pub const TIME_COLUMN: &str = "t";
/// Measured value column
pub const VALUE_COLUMN: &str = "A0";

/// Row-indexed (identifier, time, value) table.
///
/// Missing values are stored as `f64::NAN`. Row position is the index shared
/// between a masked table and its true counterpart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementTable {
    ids: Vec<String>,
    times: Vec<f64>,
    values: Vec<f64>,
}

impl MeasurementTable {
    /// Build a table from column vectors of equal length
    pub fn new(ids: Vec<String>, times: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if ids.len() != times.len() || ids.len() != values.len() {
            return Err(ImputeError::ShapeError {
                expected: format!("{} rows in every column", ids.len()),
                actual: format!("t: {}, A0: {}", times.len(), values.len()),
            });
        }
        Ok(Self { ids, times, values })
    }

    /// Build a table from `(id, t, A0)` rows
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, f64, f64)>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for (id, t, v) in rows {
            table.ids.push(id.into());
            table.times.push(t);
            table.values.push(v);
        }
        table
    }

    /// Extract the `ID`, `t` and `A0` columns of a data frame.
    ///
    /// Extra columns are ignored. `ID` is cast to string so any scalar
    /// identifier type is accepted; nulls in `A0` become missing markers.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let ids = df.column(ID_COLUMN)?.cast(&DataType::String)?;
        let times = df.column(TIME_COLUMN)?.cast(&DataType::Float64)?;
        let values = df.column(VALUE_COLUMN)?.cast(&DataType::Float64)?;

        let ids: Vec<String> = ids
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, id)| {
                id.map(str::to_string).ok_or_else(|| {
                    ImputeError::DataError(format!("null {} at row {}", ID_COLUMN, row))
                })
            })
            .collect::<Result<_>>()?;

        let times: Vec<f64> = times
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, t)| {
                t.ok_or_else(|| {
                    ImputeError::DataError(format!("null {} at row {}", TIME_COLUMN, row))
                })
            })
            .collect::<Result<_>>()?;

        let values: Vec<f64> = values
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();

        Self::new(ids, times, values)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of rows whose value is a missing marker
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Distinct identifiers in order of first appearance
    pub fn series_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Row positions carrying `id`
    pub fn positions_of(&self, id: &str) -> Vec<usize> {
        self.ids
            .iter()
            .enumerate()
            .filter(|(_, row_id)| row_id.as_str() == id)
            .map(|(row, _)| row)
            .collect()
    }
}

/// One biological replicate: a masked table and its ground truth
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateDataset {
    /// Replicate (strain) name
    pub name: String,
    /// Table with masked entries
    pub masked: MeasurementTable,
    /// Fully observed table
    pub truth: MeasurementTable,
}

impl ReplicateDataset {
    pub fn new(name: impl Into<String>, masked: MeasurementTable, truth: MeasurementTable) -> Self {
        Self {
            name: name.into(),
            masked,
            truth,
        }
    }

    /// Observation count contributed to the degrees-of-freedom total
    pub fn observations(&self) -> usize {
        self.masked.len()
    }
}
