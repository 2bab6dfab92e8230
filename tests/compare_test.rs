mod common;

use clineval::compare::{evaluate_models, RECIST_COLUMN_LABEL};
use clineval::{ComparisonTable, Error, EvaluationConfig, EvaluationRun, MetricKind};
use common::{rec, rec_recist, SheetDir};

fn exported(dir: &SheetDir, name: &str, model_row: &str, f1: &str) -> std::path::PathBuf {
    dir.write_csv(
        name,
        &[
            &[model_row],
            &["TIMELINE PER-EVENT METRICS"],
            &["Event", "TP", "FP", "FN", "Support", "Accuracy", "Precision", "Recall", "F1-Score"],
            &["Diagnosi", "1", "0", "0", "1", "1", "1", "1", f1],
            &[""],
            &["RECIST OVERALL AVERAGES"],
            &["Metric", "Accuracy", "Precision", "Recall", "F1-Score"],
            &["Macro avg", "0", "0", "0", "0"],
            &["Micro avg", "0", "0", "0", "0"],
            &["Weighted avg", "0.5", "0.5", "0.5", "0.25"],
        ],
    )
}

#[test]
fn test_table_from_exported_files() {
    let dir = SheetDir::new();
    let a = exported(&dir, "a.csv", "Model: alpha", "1");
    let b = exported(&dir, "b.csv", "", "0.5");

    let table = ComparisonTable::from_files(&[a, b], 4).unwrap();
    assert_eq!(table.model_names(), vec!["alpha", "b"]);
    assert_eq!(table.columns(), vec!["Diagnosi", RECIST_COLUMN_LABEL]);

    let matrix = table.matrix(MetricKind::F1);
    assert_eq!(matrix.rows[0].values, vec![1.0, 0.25]);
    assert_eq!(matrix.rows[1].values, vec![0.5, 0.25]);
}

#[test]
fn test_single_file_is_rejected() {
    let dir = SheetDir::new();
    let a = exported(&dir, "a.csv", "alpha", "1");
    assert!(matches!(
        ComparisonTable::from_files(&[a], 4),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_unreadable_files_are_skipped() {
    let dir = SheetDir::new();
    let a = exported(&dir, "a.csv", "alpha", "1");
    let b = exported(&dir, "b.csv", "beta", "1");
    let missing = dir.file("missing.csv");

    let table = ComparisonTable::from_files(&[a.clone(), missing.clone(), b], 4).unwrap();
    assert_eq!(table.models().len(), 2);

    // Two inputs, one of them unreadable, leave a single model
    assert!(ComparisonTable::from_files(&[a, missing], 4).is_err());
}

#[test]
fn test_evaluate_models_in_parallel() {
    let gt = vec![
        rec("1", "2024-01-01", "Diagnosi"),
        rec_recist("1", "2024-03-01", "TC torace", "PR"),
    ];
    let models = vec![
        (
            "good".to_string(),
            vec![
                rec("1", "2024-01-10", "Diagnosi"),
                rec_recist("1", "2024-03-15", "TC torace", "PR"),
            ],
        ),
        (
            "late".to_string(),
            vec![
                rec("1", "2024-05-10", "Diagnosi"),
                rec_recist("1", "2024-04-15", "TC torace", "SD"),
            ],
        ),
    ];

    let run = EvaluationRun::new(EvaluationConfig::default()).unwrap();
    let reports = evaluate_models(&run, &models, &gt).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].model_name.as_deref(), Some("good"));
    assert_eq!(reports[0].overall.tp, 2);
    assert_eq!(reports[1].overall.tp, 1);

    let table = ComparisonTable::from_reports(&reports, 4).unwrap();
    assert_eq!(table.columns(), vec!["Diagnosi", "TC torace", RECIST_COLUMN_LABEL]);
    assert_eq!(table.value(0, RECIST_COLUMN_LABEL, MetricKind::F1), 1.0);
    assert_eq!(table.value(1, "Diagnosi", MetricKind::Recall), 0.0);
    assert_eq!(table.value(1, RECIST_COLUMN_LABEL, MetricKind::Precision), 0.0);
}

#[test]
fn test_evaluate_models_propagates_errors() {
    let gt = vec![rec("1", "2024-01-01", "Diagnosi")];
    let models = vec![
        ("ok".to_string(), vec![rec("1", "2024-01-01", "Diagnosi")]),
        ("empty".to_string(), Vec::new()),
    ];
    let run = EvaluationRun::new(EvaluationConfig::default()).unwrap();
    assert!(matches!(
        evaluate_models(&run, &models, &gt),
        Err(Error::EmptyData(_))
    ));
}
