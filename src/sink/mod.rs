//! Output sinks
//!
//! - [`ImputedSink`] receives every imputed series table for inspection
//! - [`ResultSink`] records one RMSE line per evaluation run

mod imputed;
mod results;

pub use imputed::CsvImputedSink;
pub use results::{CsvResultSink, MemoryResultSink};

use crate::error::Result;
use crate::evaluation::RmseResult;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Where an imputed table came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkContext {
    /// Replicate (strain) name
    pub replicate: String,
    /// Series identifier
    pub series: String,
}

impl SinkContext {
    pub fn new(replicate: impl Into<String>, series: impl Into<String>) -> Self {
        Self {
            replicate: replicate.into(),
            series: series.into(),
        }
    }
}

/// Destination for intermediate imputed tables.
///
/// Write failures are reported to the caller, which logs and carries on.
pub trait ImputedSink: Send + Sync {
    /// Persist one imputed `[t, A0]` table tagged with its 1-based repetition
    fn write(&self, table: &Array2<f64>, repetition: usize, context: &SinkContext) -> Result<()>;
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ImputedSink for NullSink {
    fn write(&self, _table: &Array2<f64>, _repetition: usize, _context: &SinkContext) -> Result<()> {
        Ok(())
    }
}

/// Append-only store of RMSE results
pub trait ResultSink {
    fn append(&mut self, result: &RmseResult) -> Result<()>;
}
