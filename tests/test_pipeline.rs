//! Integration test: CSV tables on disk → iterative imputation → result file

use polars::prelude::*;
use proturn_impute::prelude::*;
use std::fs::{self, File};
use std::path::Path;

fn turnover_frame(ids: &[&str], masked: bool) -> DataFrame {
    let mut id_col = Vec::new();
    let mut t_col = Vec::new();
    let mut a0_col: Vec<Option<f64>> = Vec::new();

    for (s, id) in ids.iter().enumerate() {
        for i in 0..8 {
            let t = i as f64 * 3.0;
            let value = (-(0.05 + 0.02 * s as f64) * t).exp();
            id_col.push(id.to_string());
            t_col.push(t);
            a0_col.push(if masked && i == 2 { None } else { Some(value) });
        }
    }

    df!(
        "ID" => &id_col,
        "t" => &t_col,
        "A0" => &a0_col
    )
    .unwrap()
}

fn write_csv(path: &Path, df: &mut DataFrame) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut file = File::create(path).unwrap();
    CsvWriter::new(&mut file).include_header(true).finish(df).unwrap();
}

fn write_replicate(root: &Path, strain: &str, ids: &[&str]) {
    let dir = root.join(format!("proturn_output_{}_ctrl", strain));
    write_csv(&dir.join("hl-data_masked_1.csv"), &mut turnover_frame(ids, true));
    write_csv(&dir.join("hl-data_filtered.csv"), &mut turnover_frame(ids, false));
}

fn config(root: &Path) -> EvaluationConfig {
    let mut config = EvaluationConfig::new(MaskingLevel::new(1).unwrap(), ExperimentType::Ctrl)
        .with_root(root)
        .with_repetitions(3)
        .with_output_dir(root.join("rmse"))
        .with_imputed_dir(root.join("dmi_imputed_data"));
    config.layout.strains = vec!["aj".to_string(), "c57".to_string()];
    config
}

#[test]
fn test_full_pipeline_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_replicate(dir.path(), "aj", &["PEP1", "PEP2"]);
    // c57 has no tables and is skipped

    let config = config(dir.path());
    let evaluator = Evaluator::from_config(config.clone()).unwrap();
    let mut seeds = RandomSeeds::seeded(42);
    let report = evaluator
        .evaluate_experiment(&TableLoader::new(), &mut seeds)
        .unwrap();

    assert_eq!(report.result.total_observations, 16);
    assert_eq!(report.series_scored(), 2);
    assert_eq!(report.skipped_replicates.len(), 1);
    assert_eq!(report.skipped_replicates[0].replicate, "c57");
    assert!(report.rmse().is_finite());
    assert!(report.rmse() >= 0.0);

    for series in ["PEP1", "PEP2"] {
        for rep in 1..=3 {
            let path = dir
                .path()
                .join("dmi_imputed_data")
                .join("aj")
                .join(series)
                .join(format!("imputed_data_{}.csv", rep));
            assert!(path.exists(), "missing export {}", path.display());
        }
    }

    let mut sink = CsvResultSink::for_experiment(&config.output_dir, config.experiment);
    report.record(&mut sink).unwrap();
    report.record(&mut sink).unwrap();

    let contents = fs::read_to_string(config.result_path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(", 1, dmi_bayesian_ridge"));
    let rmse: f64 = lines[0].split(',').next().unwrap().trim().parse().unwrap();
    assert_eq!(rmse, report.rmse());
}

#[test]
fn test_seeded_runs_reproduce() {
    let dir = tempfile::tempdir().unwrap();
    write_replicate(dir.path(), "aj", &["PEP1", "PEP2", "PEP3"]);
    write_replicate(dir.path(), "c57", &["PEP1", "PEP4"]);

    let evaluator = Evaluator::from_config(config(dir.path()).with_export(false)).unwrap();
    let loader = TableLoader::new();

    let first = evaluator
        .evaluate_experiment(&loader, &mut RandomSeeds::seeded(7))
        .unwrap();
    let second = evaluator
        .evaluate_experiment(&loader, &mut RandomSeeds::seeded(7))
        .unwrap();

    assert_eq!(first.result.total_squared_error, second.result.total_squared_error);
    assert_eq!(first.result.total_observations, 40);
    assert!(!first.has_skips());
}

#[test]
fn test_malformed_table_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_replicate(dir.path(), "aj", &["PEP1"]);
    let broken = dir.path().join("proturn_output_c57_ctrl");
    fs::create_dir_all(&broken).unwrap();
    fs::write(broken.join("hl-data_masked_1.csv"), "ID,time\nPEP1,0.0\n").unwrap();
    fs::write(broken.join("hl-data_filtered.csv"), "ID,time\nPEP1,0.0\n").unwrap();

    let evaluator = Evaluator::from_config(config(dir.path()).with_export(false)).unwrap();
    let report = evaluator
        .evaluate_experiment(&TableLoader::new(), &mut RandomSeeds::seeded(1))
        .unwrap();

    assert_eq!(report.result.total_observations, 8);
    assert_eq!(report.skipped_replicates.len(), 1);
    assert!(report.skipped_replicates[0].reason.contains("c57"));
}

#[test]
fn test_no_tables_is_degenerate() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path()).with_export(false);
    let evaluator = Evaluator::from_config(config.clone()).unwrap();

    let err = evaluator
        .evaluate_experiment(&TableLoader::new(), &mut RandomSeeds::seeded(1))
        .unwrap_err();
    assert!(matches!(err, ImputeError::DegenerateSample { observations: 0 }));
    assert!(!config.result_path().exists());
}
