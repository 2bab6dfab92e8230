mod common;

use clineval::report::{parse_exported_grid, rows_to_grid};
use clineval::{
    EvaluationConfig, EvaluationConfigBuilder, EvaluationRun, ExportedEvaluation, RecistLabel,
};
use clineval::io::Cell;
use common::{approx, grid, rec, rec_recist, SheetDir};

fn default_run() -> EvaluationRun {
    EvaluationRun::new(EvaluationConfig::default()).unwrap()
}

#[test]
fn test_end_to_end_from_csv_files() {
    let dir = SheetDir::new();
    let predictions = dir.write_csv(
        "predictions.csv",
        &[
            &["gpt-4o-mini"],
            &["id", "data", "testo", "risposta_recist"],
            &["1", "2024-02-10", "Biopsia", ""],
            &["1", "2024-04-02", "TC torace", "PR"],
            &["1", "2024-09-01", "Diagnosi", ""],
            &["99", "2024-01-01", "Biopsia", ""],
        ],
    );
    let ground_truth = dir.write_csv(
        "ground_truth.csv",
        &[
            &["ID", "Data", "Testo", "Risposta_RECIST"],
            &["1", "2024-01-15", "Biopsia", ""],
            &["1", "2024-03-20", "TC torace", "SD"],
            &["1", "2024-01-01", "TC torace", "Baseline"],
            &["2", "2024-01-01", "Diagnosi", ""],
        ],
    );

    let report = default_run()
        .evaluate_files(&predictions, &ground_truth)
        .unwrap();

    assert_eq!(report.model_name.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(report.dropped_predictions, 1);
    assert_eq!(report.dropped_ground_truth, 1);
    assert_eq!(report.overall.tp, 2);
    assert_eq!(report.overall.fp, 1);
    assert_eq!(report.overall.fn_, 1);

    let biopsy = report.event("Biopsia").unwrap();
    assert_eq!(biopsy.metrics.f1, 1.0);

    let recist = report.recist.as_ref().unwrap();
    assert_eq!(recist.pairs, 1);
    assert_eq!(
        recist
            .confusion
            .get(RecistLabel::SD, RecistLabel::PR),
        1
    );
}

#[test]
fn test_timeline_micro_uses_overall_counts() {
    let preds = vec![
        rec("1", "2024-01-01", "A"),
        rec("1", "2024-01-01", "B"),
        rec("1", "2024-01-01", "B"),
    ];
    let gt = vec![rec("1", "2024-01-01", "A"), rec("1", "2024-01-01", "B")];
    let report = default_run().evaluate_records(&preds, &gt).unwrap();

    let micro = report.timeline_averages.micro;
    assert!(approx(micro.precision, 2.0 / 3.0));
    assert!(approx(micro.recall, 1.0));
    assert!(approx(report.overall.precision, micro.precision));
}

#[test]
fn test_patient_header_does_not_leak_into_model_name() {
    let preds = grid(&[&["patient", "data", "testo"], &["1", "2024-03-01", "Diagnosi"]]);
    let gt = grid(&[&["id", "data", "testo"], &["1", "2024-03-09", "Diagnosi"]]);

    let report = default_run().evaluate_sheets(&preds, &gt).unwrap();
    assert_eq!(report.model_name, None);
    assert_eq!(report.overall.tp, 1);

    let rows = report.to_export_rows(4);
    assert_eq!(rows[0], vec![Cell::Empty]);
}

#[test]
fn test_tolerance_from_config() {
    let preds = vec![rec("1", "2024-03-01", "X")];
    let gt = vec![rec("1", "2024-01-01", "X")];

    let strict = default_run().evaluate_records(&preds, &gt).unwrap();
    assert_eq!(strict.overall.tp, 0);

    let config = EvaluationConfigBuilder::new().tolerance_months(2).build().unwrap();
    let loose = EvaluationRun::new(config).unwrap().evaluate_records(&preds, &gt).unwrap();
    assert_eq!(loose.overall.tp, 1);
    assert_eq!(loose.tolerance_months, 2);
}

#[test]
fn test_unparsed_dates_reported() {
    let preds = vec![rec("1", "n.d.", "X"), rec("1", "2024-01-01", "X")];
    let gt = vec![rec("1", "2024-01-01", "X")];
    let report = default_run().evaluate_records(&preds, &gt).unwrap();
    assert_eq!(report.unparsed_predictions, 1);
    assert_eq!(report.overall.fp, 0);
}

#[test]
fn test_export_layout() {
    let preds = vec![
        rec_recist("1", "2024-01-01", "TC torace", "CR"),
        rec("1", "2024-02-01", "Biopsia"),
    ];
    let gt = vec![
        rec_recist("1", "2024-01-05", "TC torace", "CR"),
        rec("1", "2024-06-01", "Biopsia"),
    ];
    let report = default_run()
        .with_model_name("model-a")
        .evaluate_records(&preds, &gt)
        .unwrap();

    let g = rows_to_grid(&report.to_export_rows(4));
    assert_eq!(g[0], vec!["model-a"]);
    assert_eq!(g[1], vec!["TIMELINE OVERALL AVERAGES"]);
    assert_eq!(g[2][0], "Metric");
    assert_eq!(g[3][0], "Macro avg overall");
    assert_eq!(g[4][0], "Micro avg overall");
    assert_eq!(g[5][0], "Weighted avg overall");
    assert_eq!(g[6], vec![""]);
    assert_eq!(g[7], vec!["TIMELINE PER-EVENT METRICS"]);
    assert_eq!(g[8].len(), 9);
    assert_eq!(g[9][0], "Biopsia");
    assert_eq!(&g[9][1..5], &["0", "1", "1", "1"]);
    assert_eq!(g[10][0], "TC torace");
    assert_eq!(g[11], vec![""]);
    assert_eq!(g[12], vec!["RECIST OVERALL AVERAGES"]);
    assert_eq!(g[16][0], "Weighted avg");
    assert_eq!(g[17], vec![""]);
    assert_eq!(g[18], vec!["RECIST PER-CLASS METRICS"]);
    assert_eq!(g[19], vec!["Label", "Accuracy", "Precision", "Recall", "F1-Score", "Support"]);
    assert_eq!(g[20][0], "CR");
    assert_eq!(g[24][0], "NE");
    assert_eq!(g.len(), 26);

    // The exported layout reads back
    let parsed = parse_exported_grid(&g, "fallback");
    assert_eq!(parsed, ExportedEvaluation::from(&report));
}

#[test]
fn test_export_rounds_scores() {
    let preds = vec![
        rec("1", "2024-01-01", "X"),
        rec("1", "2024-05-01", "X"),
        rec("1", "2024-09-01", "X"),
    ];
    let gt = vec![rec("1", "2024-01-01", "X"), rec("1", "2024-05-01", "X")];
    let report = default_run().evaluate_records(&preds, &gt).unwrap();

    let g = rows_to_grid(&report.to_export_rows(4));
    // precision 2/3
    let per_event = &g[9];
    assert_eq!(per_event[6], "0.6667");
}

#[test]
fn test_write_and_read_export_file() {
    let dir = SheetDir::new();
    let preds = vec![rec("1", "2024-01-01", "Diagnosi")];
    let gt = vec![rec("1", "2024-01-01", "Diagnosi")];
    let report = default_run()
        .with_model_name("m1")
        .evaluate_records(&preds, &gt)
        .unwrap();

    let path = dir.file("m1_eval.csv");
    report.write_export(&path, 4).unwrap();

    let parsed = ExportedEvaluation::from_file(&path).unwrap();
    assert_eq!(parsed.model_name, "m1");
    assert_eq!(parsed.events.len(), 1);
    assert_eq!(parsed.events[0].metrics.f1, 1.0);
}

#[test]
fn test_report_serializes_to_json() {
    let preds = vec![rec("1", "2024-01-01", "Diagnosi")];
    let gt = vec![rec("1", "2024-01-01", "Diagnosi")];
    let report = default_run().evaluate_records(&preds, &gt).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["overall"]["tp"], 1);
    assert_eq!(json["per_event"][0]["event"], "Diagnosi");
    assert_eq!(json["timeline_averages"]["macro"]["f1"], 1.0);
    assert!(json["recist"].is_null());
}
