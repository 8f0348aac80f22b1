//! Replicate data: tables, series extraction and CSV loading

mod loader;
mod series;
mod table;

pub use loader::{ReplicatePaths, TableLoader};
pub use series::{SeriesExtractor, SeriesTable, TIME_COL, VALUE_COL};
pub use table::{MeasurementTable, ReplicateDataset, ID_COLUMN, TIME_COLUMN, VALUE_COLUMN};
