//! Hierarchical squared-error accumulation

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Running `(squared error, observation count)` pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateError {
    squared_error: f64,
    observations: usize,
}

impl AggregateError {
    pub fn new(squared_error: f64, observations: usize) -> Self {
        Self {
            squared_error,
            observations,
        }
    }

    pub fn squared_error(&self) -> f64 {
        self.squared_error
    }

    pub fn observations(&self) -> usize {
        self.observations
    }
}

impl Add for AggregateError {
    type Output = AggregateError;

    fn add(self, other: AggregateError) -> AggregateError {
        AggregateError {
            squared_error: self.squared_error + other.squared_error,
            observations: self.observations + other.observations,
        }
    }
}

impl AddAssign for AggregateError {
    fn add_assign(&mut self, other: AggregateError) {
        *self = *self + other;
    }
}

/// Score of one fully processed series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesScore {
    pub replicate: String,
    pub series_id: String,
    /// Mean over repetitions of the per-series squared-error sum
    pub average_squared_error: f64,
    /// Rows of the series
    pub observations: usize,
    pub repetitions: usize,
}

/// Series left out of the totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSeries {
    pub replicate: String,
    pub series_id: String,
    pub reason: String,
}

/// Replicate left out of the totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedReplicate {
    pub replicate: String,
    pub reason: String,
}

/// Outcome of one series work unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SeriesOutcome {
    Scored(SeriesScore),
    Skipped(SkippedSeries),
}

/// Totals of one replicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicateTotals {
    pub replicate: String,
    pub totals: AggregateError,
    pub series_scored: usize,
    pub series_skipped: usize,
}

impl ReplicateTotals {
    fn new(replicate: &str) -> Self {
        Self {
            replicate: replicate.to_string(),
            totals: AggregateError::default(),
            series_scored: 0,
            series_skipped: 0,
        }
    }
}

/// Accumulates series scores per replicate and across the experiment.
///
/// Only complete series scores are recorded, so the error sum and the
/// observation count always cover the same rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorAggregator {
    replicates: Vec<ReplicateTotals>,
    skipped_replicates: Vec<SkippedReplicate>,
    skipped_series: Vec<SkippedSeries>,
    total: AggregateError,
}

impl ErrorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn replicate_entry(&mut self, replicate: &str) -> &mut ReplicateTotals {
        let index = match self.replicates.iter().position(|r| r.replicate == replicate) {
            Some(index) => index,
            None => {
                self.replicates.push(ReplicateTotals::new(replicate));
                self.replicates.len() - 1
            }
        };
        &mut self.replicates[index]
    }

    /// Register a loaded replicate, even if it ends up with no series
    pub fn begin_replicate(&mut self, replicate: &str) {
        self.replicate_entry(replicate);
    }

    /// Add one scored series to its replicate and the experiment total
    pub fn record_series(&mut self, score: &SeriesScore) {
        let contribution = AggregateError::new(score.average_squared_error, score.observations);
        let entry = self.replicate_entry(&score.replicate);
        entry.totals += contribution;
        entry.series_scored += 1;
        self.total += contribution;
    }

    pub fn skip_series(&mut self, skipped: SkippedSeries) {
        self.replicate_entry(&skipped.replicate).series_skipped += 1;
        self.skipped_series.push(skipped);
    }

    pub fn skip_replicate(&mut self, skipped: SkippedReplicate) {
        self.skipped_replicates.push(skipped);
    }

    /// Fold one work-unit outcome into the totals
    pub fn record(&mut self, outcome: SeriesOutcome) {
        match outcome {
            SeriesOutcome::Scored(score) => self.record_series(&score),
            SeriesOutcome::Skipped(skipped) => self.skip_series(skipped),
        }
    }

    /// Combine with another aggregator; order does not affect totals
    pub fn merge(&mut self, other: ErrorAggregator) {
        for theirs in other.replicates {
            let entry = self.replicate_entry(&theirs.replicate);
            entry.totals += theirs.totals;
            entry.series_scored += theirs.series_scored;
            entry.series_skipped += theirs.series_skipped;
        }
        self.skipped_replicates.extend(other.skipped_replicates);
        self.skipped_series.extend(other.skipped_series);
        self.total += other.total;
    }

    pub fn total(&self) -> AggregateError {
        self.total
    }

    pub fn total_squared_error(&self) -> f64 {
        self.total.squared_error()
    }

    pub fn total_observations(&self) -> usize {
        self.total.observations()
    }

    pub fn replicates(&self) -> &[ReplicateTotals] {
        &self.replicates
    }

    pub fn skipped_replicates(&self) -> &[SkippedReplicate] {
        &self.skipped_replicates
    }

    pub fn skipped_series(&self) -> &[SkippedSeries] {
        &self.skipped_series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(replicate: &str, id: &str, error: f64, rows: usize) -> SeriesScore {
        SeriesScore {
            replicate: replicate.to_string(),
            series_id: id.to_string(),
            average_squared_error: error,
            observations: rows,
            repetitions: 10,
        }
    }

    #[test]
    fn test_hierarchical_totals() {
        let mut agg = ErrorAggregator::new();
        agg.record_series(&score("aj", "p1", 1.5, 3));
        agg.record_series(&score("aj", "p2", 0.5, 4));
        agg.record_series(&score("dba", "p1", 2.0, 5));

        assert_eq!(agg.total_squared_error(), 4.0);
        assert_eq!(agg.total_observations(), 12);
        assert_eq!(agg.replicates().len(), 2);
        assert_eq!(agg.replicates()[0].totals, AggregateError::new(2.0, 7));
        assert_eq!(agg.replicates()[0].series_scored, 2);
    }

    #[test]
    fn test_skipped_series_contribute_nothing() {
        let mut agg = ErrorAggregator::new();
        agg.record(SeriesOutcome::Scored(score("aj", "p1", 1.0, 3)));
        agg.record(SeriesOutcome::Skipped(SkippedSeries {
            replicate: "aj".to_string(),
            series_id: "p2".to_string(),
            reason: "diverged".to_string(),
        }));
        agg.skip_replicate(SkippedReplicate {
            replicate: "fvb".to_string(),
            reason: "missing".to_string(),
        });

        assert_eq!(agg.total(), AggregateError::new(1.0, 3));
        assert_eq!(agg.replicates()[0].series_skipped, 1);
        assert_eq!(agg.skipped_series().len(), 1);
        assert_eq!(agg.skipped_replicates()[0].replicate, "fvb");
    }

    #[test]
    fn test_merge_is_order_independent() {
        let parts = [
            score("aj", "p1", 0.25, 3),
            score("c57", "p1", 1.0, 2),
            score("aj", "p2", 0.75, 6),
        ];

        let mut forward = ErrorAggregator::new();
        for s in &parts {
            let mut unit = ErrorAggregator::new();
            unit.record_series(s);
            forward.merge(unit);
        }

        let mut backward = ErrorAggregator::new();
        for s in parts.iter().rev() {
            let mut unit = ErrorAggregator::new();
            unit.record_series(s);
            backward.merge(unit);
        }

        assert_eq!(forward.total(), backward.total());
        assert_eq!(forward.total_observations(), 11);
    }

    #[test]
    fn test_begin_replicate_registers_empty() {
        let mut agg = ErrorAggregator::new();
        agg.begin_replicate("cej");
        assert_eq!(agg.replicates().len(), 1);
        assert_eq!(agg.total_observations(), 0);
    }
}
