use clineval::matching::match_events;
use clineval::{EvaluationConfig, EvaluationRun, NormalizedRecord, RecistPair, RecistSummary};
use proptest::prelude::*;

fn record_strategy() -> impl Strategy<Value = NormalizedRecord> {
    (
        prop::sample::select(vec!["1", "2", "3"]),
        2022i32..2025,
        1u32..=12,
        1u32..=28,
        prop::sample::select(vec!["Biopsia", "Diagnosi", "TC torace"]),
        prop::sample::select(vec!["", "CR", "PR", "SD", "PD", "NE", "BASELINE"]),
    )
        .prop_map(|(id, year, month, day, event, recist)| {
            NormalizedRecord::new(id, format!("{:04}-{:02}-{:02}", year, month, day), event)
                .with_recist(recist)
        })
}

fn label_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["CR", "PR", "SD", "PD", "NE", "??"]).prop_map(str::to_string)
}

proptest! {
    #[test]
    fn prop_counts_conserved(
        preds in prop::collection::vec(record_strategy(), 0..40),
        gt in prop::collection::vec(record_strategy(), 0..40),
        tolerance in 0u32..3,
    ) {
        let outcome = match_events(&preds, &gt, tolerance);
        for key in &outcome.per_key {
            prop_assert_eq!(key.counts.tp + key.counts.fn_, key.ground_truth);
            prop_assert_eq!(key.counts.tp + key.counts.fp, key.predictions);
        }
        prop_assert_eq!(outcome.matches.len(), outcome.overall.tp);
        for m in &outcome.matches {
            prop_assert!(m.month_offset.unsigned_abs() <= tolerance);
            prop_assert_eq!(&preds[m.prediction_index].match_key(), &m.key);
            prop_assert_eq!(&gt[m.ground_truth_index].match_key(), &m.key);
        }
    }

    #[test]
    fn prop_evaluation_is_deterministic(
        preds in prop::collection::vec(record_strategy(), 1..30),
        gt in prop::collection::vec(record_strategy(), 1..30),
    ) {
        let run = EvaluationRun::new(EvaluationConfig::default()).unwrap();
        let first = run.evaluate_records(&preds, &gt);
        let second = run.evaluate_records(&preds, &gt);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(
                    serde_json::to_string(&a).unwrap(),
                    serde_json::to_string(&b).unwrap()
                );
            }
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            _ => prop_assert!(false, "runs disagreed on success"),
        }
    }

    #[test]
    fn prop_scores_are_bounded(
        pairs in prop::collection::vec((label_strategy(), label_strategy()), 0..50),
    ) {
        let pairs: Vec<RecistPair> = pairs
            .into_iter()
            .map(|(gt, pred)| RecistPair::new(gt, pred))
            .collect();
        let summary = RecistSummary::from_pairs(&pairs);

        prop_assert_eq!(summary.confusion.total(), pairs.len());
        for class in &summary.per_class {
            let m = class.metrics;
            for v in [m.precision, m.recall, m.accuracy, m.f1] {
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }
        let avg = summary.averages;
        for s in [avg.macro_avg, avg.micro, avg.weighted] {
            for v in [s.precision, s.recall, s.accuracy, s.f1] {
                prop_assert!(!v.is_nan());
                prop_assert!((0.0..=1.0 + 1e-12).contains(&v));
            }
        }
    }
}
