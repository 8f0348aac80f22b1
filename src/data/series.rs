//! Per-identifier series extraction

use crate::data::table::MeasurementTable;
use crate::error::{ImputeError, Result};
use ndarray::{Array1, Array2, ArrayView1};

/// Column index of the time values in a [`SeriesTable`]
pub const TIME_COL: usize = 0;
/// Column index of the measured values in a [`SeriesTable`]
pub const VALUE_COL: usize = 1;

/// One series' rows as a `[t, A0]` matrix plus the row positions they came from
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTable {
    id: String,
    positions: Vec<usize>,
    data: Array2<f64>,
}

impl SeriesTable {
    /// Build a series directly from time and value vectors
    pub fn from_columns(id: impl Into<String>, times: &[f64], values: &[f64]) -> Result<Self> {
        if times.len() != values.len() {
            return Err(ImputeError::ShapeError {
                expected: format!("{} values", times.len()),
                actual: format!("{} values", values.len()),
            });
        }
        let data = Array2::from_shape_fn((times.len(), 2), |(row, col)| match col {
            TIME_COL => times[row],
            _ => values[row],
        });
        Ok(Self {
            id: id.into(),
            positions: (0..times.len()).collect(),
            data,
        })
    }

    fn gather(id: &str, table: &MeasurementTable, positions: &[usize]) -> Self {
        let times = table.times();
        let values = table.values();
        let data = Array2::from_shape_fn((positions.len(), 2), |(row, col)| match col {
            TIME_COL => times[positions[row]],
            _ => values[positions[row]],
        });
        Self {
            id: id.to_string(),
            positions: positions.to_vec(),
            data,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Source row positions, in table order
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// `[t, A0]` matrix, missing values as NaN
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn times(&self) -> ArrayView1<'_, f64> {
        self.data.column(TIME_COL)
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.data.column(VALUE_COL)
    }

    /// Owned copy of the value column
    pub fn value_vector(&self) -> Array1<f64> {
        self.values().to_owned()
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    pub fn missing_count(&self) -> usize {
        self.values().iter().filter(|v| v.is_nan()).count()
    }
}

/// Splits a replicate's tables into aligned per-identifier series.
///
/// The true table is addressed by the masked table's row positions; rows are
/// never re-joined on identifier and time, so both tables must keep the same
/// row order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesExtractor;

impl SeriesExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract `(masked, true)` series for `id`
    pub fn extract(
        &self,
        masked: &MeasurementTable,
        truth: &MeasurementTable,
        id: &str,
    ) -> Result<(SeriesTable, SeriesTable)> {
        let positions = masked.positions_of(id);
        let Some(&last) = positions.last() else {
            return Err(ImputeError::DataError(format!(
                "series {} not present in masked table",
                id
            )));
        };

        if last >= truth.len() {
            return Err(ImputeError::Alignment {
                series: id.to_string(),
                required: last,
                available: truth.len(),
            });
        }

        Ok((
            SeriesTable::gather(id, masked, &positions),
            SeriesTable::gather(id, truth, &positions),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> (MeasurementTable, MeasurementTable) {
        let masked = MeasurementTable::from_rows(vec![
            ("a", 0.0, 1.0),
            ("b", 0.0, 10.0),
            ("a", 1.0, f64::NAN),
            ("b", 1.0, 12.0),
            ("a", 2.0, 3.0),
        ]);
        let truth = MeasurementTable::from_rows(vec![
            ("a", 0.0, 1.0),
            ("b", 0.0, 10.0),
            ("a", 1.0, 2.0),
            ("b", 1.0, 12.0),
            ("a", 2.0, 3.0),
        ]);
        (masked, truth)
    }

    #[test]
    fn test_extract_aligned_positions() {
        let (masked, truth) = tables();
        let (m, t) = SeriesExtractor::new().extract(&masked, &truth, "a").unwrap();

        assert_eq!(m.positions(), &[0, 2, 4]);
        assert_eq!(t.positions(), m.positions());
        assert_eq!(m.times().to_vec(), vec![0.0, 1.0, 2.0]);
        assert!(m.values()[1].is_nan());
        assert_eq!(t.values().to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(m.missing_count(), 1);
    }

    #[test]
    fn test_extract_uses_position_not_identifier() {
        let (masked, _) = tables();
        // True table rows reordered: positions are still used verbatim
        let truth = MeasurementTable::from_rows(vec![
            ("b", 0.0, 10.0),
            ("a", 0.0, 1.0),
            ("b", 1.0, 12.0),
            ("a", 1.0, 2.0),
            ("a", 2.0, 3.0),
        ]);
        let (_, t) = SeriesExtractor::new().extract(&masked, &truth, "a").unwrap();
        assert_eq!(t.values().to_vec(), vec![10.0, 12.0, 3.0]);
    }

    #[test]
    fn test_extract_short_true_table() {
        let (masked, _) = tables();
        let truth = MeasurementTable::from_rows(vec![("a", 0.0, 1.0), ("b", 0.0, 10.0)]);

        let err = SeriesExtractor::new().extract(&masked, &truth, "a").unwrap_err();
        match err {
            ImputeError::Alignment { required, available, .. } => {
                assert_eq!(required, 4);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extract_unknown_series() {
        let (masked, truth) = tables();
        assert!(SeriesExtractor::new().extract(&masked, &truth, "zzz").is_err());
    }
}
