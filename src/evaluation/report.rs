//! Evaluation report

use crate::error::Result;
use crate::evaluation::aggregator::{ReplicateTotals, SkippedReplicate, SkippedSeries};
use crate::evaluation::rmse::RmseResult;
use crate::sink::ResultSink;
use serde::{Deserialize, Serialize};

/// Outcome of a complete evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Final metric
    pub result: RmseResult,
    /// Per-replicate totals, in input order
    pub replicates: Vec<ReplicateTotals>,
    pub skipped_replicates: Vec<SkippedReplicate>,
    pub skipped_series: Vec<SkippedSeries>,
    /// Wall-clock duration in seconds
    pub elapsed_secs: f64,
}

impl EvaluationReport {
    pub fn rmse(&self) -> f64 {
        self.result.rmse
    }

    /// Number of series that contributed to the totals
    pub fn series_scored(&self) -> usize {
        self.replicates.iter().map(|r| r.series_scored).sum()
    }

    /// Whether any replicate or series was left out
    pub fn has_skips(&self) -> bool {
        !self.skipped_replicates.is_empty() || !self.skipped_series.is_empty()
    }

    /// Append the result to `sink`
    pub fn record(&self, sink: &mut dyn ResultSink) -> Result<()> {
        sink.append(&self.result)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
