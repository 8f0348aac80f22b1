//! Integration test: evaluator scenarios with scripted imputation models

use ndarray::Array2;
use proturn_impute::prelude::*;
use proturn_impute::data::VALUE_COL;
use proturn_impute::sink::MemoryResultSink;

/// Fills every missing value with the repetition seed
struct SeedFill;

impl ImputationModel for SeedFill {
    fn impute(&self, data: &Array2<f64>, seed: u64) -> Result<Array2<f64>> {
        Ok(data.mapv(|v| if v.is_nan() { seed as f64 } else { v }))
    }
}

/// Fills missing values with the observed column mean plus seeded noise
struct NoisyMean;

impl ImputationModel for NoisyMean {
    fn impute(&self, data: &Array2<f64>, seed: u64) -> Result<Array2<f64>> {
        use rand::prelude::*;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut out = data.clone();
        let mut column = out.column_mut(VALUE_COL);
        let observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
        let mean = observed.iter().sum::<f64>() / observed.len().max(1) as f64;
        for v in column.iter_mut() {
            if v.is_nan() {
                *v = mean + rng.gen::<f64>();
            }
        }
        Ok(out)
    }
}

fn config(repetitions: usize) -> EvaluationConfig {
    EvaluationConfig::new(MaskingLevel::new(1).unwrap(), ExperimentType::Ctrl)
        .with_repetitions(repetitions)
        .with_export(false)
}

fn replicate(name: &str, id: &str, masked: &[f64], truth: &[f64]) -> ReplicateDataset {
    let rows = |values: &[f64]| {
        MeasurementTable::from_rows(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (id.to_string(), i as f64 * 2.0, v))
                .collect::<Vec<_>>(),
        )
    };
    ReplicateDataset::new(name, rows(masked), rows(truth))
}

fn two_replicates() -> Vec<ReplicateInput> {
    vec![
        replicate("a", "P1", &[1.0, f64::NAN, 3.0], &[1.0, 5.0, 3.0]).into(),
        replicate("b", "P2", &[2.0, f64::NAN, 4.0], &[2.0, 10.0, 4.0]).into(),
    ]
}

#[test]
fn test_two_replicate_scenario() {
    let evaluator = Evaluator::new(config(1), SeedFill).unwrap();
    // Replicate a imputes 5.0 exactly, replicate b imputes 12.0 against 10.0
    let mut seeds = FixedSeeds::new(vec![5, 12]).unwrap();

    let report = evaluator.evaluate(two_replicates(), &mut seeds).unwrap();

    assert_eq!(report.result.total_squared_error, 4.0);
    assert_eq!(report.result.total_observations, 6);
    assert!((report.rmse() - (4.0f64 / 5.0).sqrt()).abs() < 1e-12);
    assert!((report.rmse() - 0.894).abs() < 1e-3);
    assert!(!report.has_skips());

    let mut sink = MemoryResultSink::new();
    report.record(&mut sink).unwrap();
    assert_eq!(sink.records().len(), 1);
    assert_eq!(sink.records()[0].method_label, "dmi_bayesian_ridge");
}

#[test]
fn test_degenerate_single_row() {
    let evaluator = Evaluator::new(config(1), SeedFill).unwrap();
    let inputs: Vec<ReplicateInput> = vec![replicate("a", "P1", &[1.0], &[1.0]).into()];
    let mut seeds = FixedSeeds::new(vec![1]).unwrap();

    let err = evaluator.evaluate(inputs, &mut seeds).unwrap_err();
    assert!(matches!(err, ImputeError::DegenerateSample { observations: 1 }));
}

#[test]
fn test_missing_replicate_matches_absent_replicate() {
    let evaluator = Evaluator::new(config(1), SeedFill).unwrap();

    let mut with_missing = two_replicates();
    with_missing.insert(
        1,
        ReplicateInput::Failed {
            name: "c57".to_string(),
            error: ImputeError::MissingFile {
                path: "proturn_output_c57_ctrl/hl-data_masked_1.csv".into(),
            },
        },
    );

    let mut seeds = FixedSeeds::new(vec![5, 12]).unwrap();
    let skipped = evaluator.evaluate(with_missing, &mut seeds).unwrap();
    seeds.reset();
    let baseline = evaluator.evaluate(two_replicates(), &mut seeds).unwrap();

    assert_eq!(skipped.rmse(), baseline.rmse());
    assert_eq!(skipped.result.total_observations, baseline.result.total_observations);
    assert_eq!(skipped.skipped_replicates.len(), 1);
    assert_eq!(skipped.skipped_replicates[0].replicate, "c57");
}

#[test]
fn test_fixed_seeds_are_deterministic() {
    let inputs = || -> Vec<ReplicateInput> {
        (0..3)
            .map(|i| {
                let name = format!("r{}", i);
                let base = i as f64;
                ReplicateInput::from(replicate(
                    &name,
                    "P",
                    &[base, f64::NAN, base + 2.0, f64::NAN],
                    &[base, base + 1.0, base + 2.0, base + 3.0],
                ))
            })
            .collect()
    };
    let seeds = vec![3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5, 8];

    let sequential = Evaluator::new(config(4), NoisyMean).unwrap();
    let parallel = Evaluator::new(config(4).with_parallel(true).with_threads(3), NoisyMean).unwrap();

    let first = sequential
        .evaluate(inputs(), &mut FixedSeeds::new(seeds.clone()).unwrap())
        .unwrap();
    let second = sequential
        .evaluate(inputs(), &mut FixedSeeds::new(seeds.clone()).unwrap())
        .unwrap();
    let third = parallel
        .evaluate(inputs(), &mut FixedSeeds::new(seeds).unwrap())
        .unwrap();

    assert_eq!(first.result.total_squared_error, second.result.total_squared_error);
    assert_eq!(first.result.total_squared_error, third.result.total_squared_error);
    assert_eq!(first.rmse(), third.rmse());
}

#[test]
fn test_complete_replicate_excluded_keeps_rmse() {
    let complete = || -> ReplicateInput {
        replicate("full", "P9", &[7.0, 8.0, 9.0], &[7.0, 8.0, 9.0]).into()
    };
    let evaluator = Evaluator::new(config(1).with_exclude_complete_series(true), SeedFill).unwrap();

    let mut seeds = FixedSeeds::new(vec![5, 12]).unwrap();
    let baseline = evaluator.evaluate(two_replicates(), &mut seeds).unwrap();

    let mut inputs = two_replicates();
    inputs.push(complete());
    seeds.reset();
    let extended = evaluator.evaluate(inputs, &mut seeds).unwrap();

    assert_eq!(baseline.rmse(), extended.rmse());
    assert_eq!(extended.result.total_observations, 6);
}

#[test]
fn test_complete_replicate_counted_by_default() {
    let evaluator = Evaluator::new(config(1), SeedFill).unwrap();
    let mut inputs = two_replicates();
    inputs.push(replicate("full", "P9", &[7.0, 8.0, 9.0], &[7.0, 8.0, 9.0]).into());

    let mut seeds = FixedSeeds::new(vec![5, 12, 0]).unwrap();
    let report = evaluator.evaluate(inputs, &mut seeds).unwrap();

    assert_eq!(report.result.total_squared_error, 4.0);
    assert_eq!(report.result.total_observations, 9);
    assert!((report.rmse() - (4.0f64 / 8.0).sqrt()).abs() < 1e-12);
}

#[test]
fn test_repetitions_are_averaged_per_series() {
    let evaluator = Evaluator::new(config(2), SeedFill).unwrap();
    let inputs: Vec<ReplicateInput> =
        vec![replicate("a", "P1", &[1.0, f64::NAN, 3.0], &[1.0, 5.0, 3.0]).into()];
    // Errors 1.0 and 9.0 average to 5.0
    let mut seeds = FixedSeeds::new(vec![6, 8]).unwrap();

    let report = evaluator.evaluate(inputs, &mut seeds).unwrap();
    assert_eq!(report.result.total_squared_error, 5.0);
    assert!((report.rmse() - (5.0f64 / 2.0).sqrt()).abs() < 1e-12);
}
