mod common;

use clineval::metrics::{macro_average, micro_average, weighted_average};
use clineval::{
    AveragedMetrics, ConfusionMatrix, Counts, MetricRow, RecistLabel, RecistPair, RecistSummary,
};
use common::approx;

fn row(tp: usize, fp: usize, fn_: usize) -> MetricRow {
    MetricRow::from_counts(Counts::new(tp, fp, fn_))
}

#[test]
fn test_recist_confusion_scenario() {
    let pairs = vec![
        RecistPair::new("CR", "CR"),
        RecistPair::new("PR", "SD"),
        RecistPair::new("SD", "SD"),
    ];
    let summary = RecistSummary::from_pairs(&pairs);
    let m = &summary.confusion;

    assert_eq!(m.get(RecistLabel::CR, RecistLabel::CR), 1);
    assert_eq!(m.get(RecistLabel::PR, RecistLabel::SD), 1);
    assert_eq!(m.get(RecistLabel::SD, RecistLabel::SD), 1);
    assert_eq!(m.total(), 3);

    let sd = summary.class(RecistLabel::SD).metrics;
    assert_eq!(sd.counts(), Counts::new(1, 1, 0));
    assert!(approx(sd.precision, 0.5));
    assert!(approx(sd.recall, 1.0));
    assert!((sd.f1 - 0.667).abs() < 1e-3);

    let pr = summary.class(RecistLabel::PR).metrics;
    assert_eq!(pr.counts(), Counts::new(0, 0, 1));
    assert_eq!(pr.f1, 0.0);
}

#[test]
fn test_recist_zero_support_classes_reported() {
    let summary = RecistSummary::from_pairs(&[RecistPair::new("PD", "PD")]);
    assert_eq!(summary.per_class.len(), 5);
    let cr = summary.class(RecistLabel::CR).metrics;
    assert_eq!(cr.support, 0);
    assert_eq!(cr.precision, 0.0);
    // Only PD has support, so macro equals PD's scores
    assert_eq!(summary.averages.macro_avg.f1, 1.0);
    assert_eq!(summary.averages.weighted.f1, 1.0);
}

#[test]
fn test_recist_micro_pools_all_classes() {
    let pairs = vec![
        RecistPair::new("CR", "CR"),
        RecistPair::new("PR", "SD"),
        RecistPair::new("SD", "SD"),
    ];
    let summary = RecistSummary::from_pairs(&pairs);
    // Every off-diagonal cell is one FP and one FN
    let micro = summary.averages.micro;
    assert!(approx(micro.precision, 2.0 / 3.0));
    assert!(approx(micro.recall, 2.0 / 3.0));
    assert!(approx(micro.accuracy, 0.5));
    assert!(approx(summary.agreement, 2.0 / 3.0));
}

#[test]
fn test_micro_f1_differs_from_mean_f1() {
    // Group A: large and perfect. Group B: small and poor.
    let rows = [row(9, 0, 0), row(0, 1, 1)];

    let macro_f1 = macro_average(&rows).f1;
    let micro_f1 = micro_average(&rows).f1;

    assert!(approx(macro_f1, 0.5));
    assert!(approx(micro_f1, 0.9));
    assert!((macro_f1 - micro_f1).abs() > 0.1);
}

#[test]
fn test_weighted_average_uses_support() {
    let rows = [row(2, 0, 2), row(1, 0, 0), row(0, 3, 0)];
    let w = weighted_average(&rows);
    // recall 0.5 (support 4), recall 1.0 (support 1); zero-support row ignored
    assert!(approx(w.recall, (0.5 * 4.0 + 1.0) / 5.0));
    assert!(approx(w.precision, 1.0));
}

#[test]
fn test_pooled_averages_override_micro() {
    let rows = [row(1, 0, 0), row(1, 1, 0)];
    let pooled = Counts::new(2, 0, 2);
    let avg = AveragedMetrics::with_pooled(&rows, pooled);
    assert!(approx(avg.micro.precision, 1.0));
    assert!(approx(avg.micro.recall, 0.5));
    assert_eq!(avg.macro_avg, AveragedMetrics::from_rows(&rows).macro_avg);
}

#[test]
fn test_no_nan_anywhere() {
    let summary = RecistSummary::from_pairs(&[]);
    let all = [
        summary.averages.macro_avg,
        summary.averages.micro,
        summary.averages.weighted,
    ];
    for scores in all {
        for v in [scores.precision, scores.recall, scores.accuracy, scores.f1] {
            assert!(!v.is_nan());
            assert_eq!(v, 0.0);
        }
    }
    assert_eq!(ConfusionMatrix::new().trace(), 0);
}

#[test]
fn test_metric_row_serializes_fn_field() {
    let json = serde_json::to_value(row(1, 2, 3)).unwrap();
    assert_eq!(json["fn"], 3);
    assert_eq!(json["support"], 4);
}
