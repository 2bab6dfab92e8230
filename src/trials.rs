//! Trial-matching evaluation
//!
//! Scores per-patient clinical-trial predictions (`eligible`, `unknown`,
//! `not_eligible` with a confidence and a triage route) against labelled
//! patient/trial pairs. Patients with an eligible ground-truth trial are
//! "matchable" and scored on ranking; the others are scored on how often
//! they were wrongly declared eligible. Pairs labelled `unknown` measure
//! whether the model deferred to a human.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{Error, Result};
use crate::io;
use crate::metrics::{
    confidence_separation, false_positive_rate, rank_trials, top_k_hit, triage_distribution,
    Eligibility, EligibilityScores, TrialPrediction,
};
use crate::normalize::{column_key, lookup, rows_from_grid, RawRow};

/// Triage routes that hand a case to a human
pub const DEFERRAL_TRIAGE: &[&str] = &["review", "human_required"];

const PATIENT_COLUMN: &str = "patient_id";
const TRIAL_COLUMN: &str = "trial_id";
const PREDICTION_COLUMN: &str = "prediction";
const CONFIDENCE_COLUMN: &str = "confidence";
const TRIAGE_COLUMN: &str = "triage";
const GROUND_TRUTH_COLUMN: &str = "ground_truth";

const HEADER_SCAN_ROWS: usize = 20;

/// Ground-truth eligibility of one patient for one trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialLabel {
    pub patient_id: String,
    pub trial_id: String,
    pub ground_truth: Eligibility,
}

impl TrialLabel {
    pub fn new(
        patient_id: impl Into<String>,
        trial_id: impl Into<String>,
        ground_truth: Eligibility,
    ) -> Self {
        TrialLabel {
            patient_id: patient_id.into(),
            trial_id: trial_id.into(),
            ground_truth,
        }
    }
}

/// A patient's predicted trials in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientTrials {
    pub patient_id: String,
    pub trials: Vec<TrialPrediction>,
}

/// Group predictions by patient, patients in order of first appearance
pub fn group_by_patient<I>(rows: I) -> Vec<PatientTrials>
where
    I: IntoIterator<Item = (String, TrialPrediction)>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut patients: Vec<PatientTrials> = Vec::new();
    for (patient_id, trial) in rows {
        let index = *positions.entry(patient_id.clone()).or_insert_with(|| {
            patients.push(PatientTrials {
                patient_id,
                trials: Vec::new(),
            });
            patients.len() - 1
        });
        patients[index].trials.push(trial);
    }
    patients
}

/// Ranking quality over patients with an eligible ground-truth trial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchableSummary {
    pub patients: usize,
    pub top1_accuracy: f64,
    pub recall_at_3: f64,
    /// Mean over patients with at least one competing trial
    pub mean_confidence_separation: Option<f64>,
    /// Triage route given to each ground-truth trial
    pub ground_truth_triage: BTreeMap<String, usize>,
}

/// False positives over patients without an eligible ground-truth trial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NonMatchableSummary {
    pub patients: usize,
    pub mean_false_positive_rate: f64,
    pub triage: BTreeMap<String, usize>,
}

/// Behaviour on patient/trial pairs labelled `unknown`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndeterminateSummary {
    pub cases: usize,
    /// Share routed to a human (see [`DEFERRAL_TRIAGE`])
    pub appropriate_deferral_rate: f64,
    /// Share predicted eligible
    pub unsafe_automation_rate: f64,
}

/// Full trial-matching evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialEvaluationReport {
    pub matchable: MatchableSummary,
    pub non_matchable: NonMatchableSummary,
    pub indeterminate: Option<IndeterminateSummary>,
    /// Predictions against labelled pairs, `unknown` on either side excluded
    pub eligibility: EligibilityScores,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn share(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Score grouped predictions against ground-truth labels
pub fn evaluate_trials(
    patients: &[PatientTrials],
    labels: &[TrialLabel],
) -> Result<TrialEvaluationReport> {
    if patients.iter().all(|p| p.trials.is_empty()) {
        return Err(Error::EmptyData("trial predictions".to_string()));
    }
    if labels.is_empty() {
        return Err(Error::EmptyData("trial ground truth".to_string()));
    }

    // Last eligible label wins when a patient has several
    let mut eligible_trial: HashMap<&str, &str> = HashMap::new();
    let mut label_of: HashMap<(&str, &str), Eligibility> = HashMap::new();
    for label in labels {
        if label.ground_truth == Eligibility::Eligible {
            eligible_trial.insert(label.patient_id.as_str(), label.trial_id.as_str());
        }
        label_of.insert(
            (label.patient_id.as_str(), label.trial_id.as_str()),
            label.ground_truth,
        );
    }

    let mut top1 = Vec::new();
    let mut top3 = Vec::new();
    let mut separations = Vec::new();
    let mut gt_triage = BTreeMap::new();
    let mut fp_rates = Vec::new();
    let mut non_matchable_trials: Vec<&TrialPrediction> = Vec::new();

    for patient in patients {
        match eligible_trial.get(patient.patient_id.as_str()) {
            Some(&gt_trial) => {
                let ranked = rank_trials(&patient.trials);
                top1.push(top_k_hit(&ranked, gt_trial, 1));
                top3.push(top_k_hit(&ranked, gt_trial, 3));
                if let Some(sep) = confidence_separation(&ranked, gt_trial) {
                    separations.push(sep);
                }
                match ranked.iter().find(|t| t.trial_id == gt_trial) {
                    Some(t) => *gt_triage.entry(t.triage.clone()).or_insert(0) += 1,
                    None => log::warn!(
                        "Patient {}: eligible trial {} was not predicted",
                        patient.patient_id,
                        gt_trial
                    ),
                }
            }
            None => {
                fp_rates.push(false_positive_rate(&patient.trials));
                non_matchable_trials.extend(&patient.trials);
            }
        }
    }

    let as_rate = |hits: &[bool]| mean(&hits.iter().map(|&h| h as u8 as f64).collect::<Vec<_>>());
    let matchable = MatchableSummary {
        patients: top1.len(),
        top1_accuracy: as_rate(&top1),
        recall_at_3: as_rate(&top3),
        mean_confidence_separation: (!separations.is_empty()).then(|| mean(&separations)),
        ground_truth_triage: gt_triage,
    };
    let non_matchable = NonMatchableSummary {
        patients: fp_rates.len(),
        mean_false_positive_rate: mean(&fp_rates),
        triage: triage_distribution(non_matchable_trials),
    };

    let mut pairs = Vec::new();
    let mut unknown_cases: Vec<&TrialPrediction> = Vec::new();
    for patient in patients {
        for trial in &patient.trials {
            match label_of.get(&(patient.patient_id.as_str(), trial.trial_id.as_str())) {
                Some(Eligibility::Unknown) => unknown_cases.push(trial),
                Some(&gt) => pairs.push((gt, trial.prediction)),
                None => {}
            }
        }
    }

    let indeterminate = (!unknown_cases.is_empty()).then(|| {
        let deferred = unknown_cases
            .iter()
            .filter(|t| DEFERRAL_TRIAGE.contains(&t.triage.as_str()))
            .count();
        let automated = unknown_cases
            .iter()
            .filter(|t| t.prediction == Eligibility::Eligible)
            .count();
        IndeterminateSummary {
            cases: unknown_cases.len(),
            appropriate_deferral_rate: share(deferred, unknown_cases.len()),
            unsafe_automation_rate: share(automated, unknown_cases.len()),
        }
    });

    log::info!(
        "Trial evaluation: {} matchable, {} non-matchable patients, {} labelled pairs",
        matchable.patients,
        non_matchable.patients,
        pairs.len()
    );

    Ok(TrialEvaluationReport {
        matchable,
        non_matchable,
        indeterminate,
        eligibility: EligibilityScores::from_pairs(&pairs),
    })
}

fn header_rows(grid: &[Vec<String>], required: &[&str]) -> Result<Vec<RawRow>> {
    let header = grid.iter().take(HEADER_SCAN_ROWS).position(|row| {
        let cells: Vec<String> = row.iter().map(|c| column_key(c)).collect();
        required.iter().all(|name| cells.iter().any(|c| c == name))
    });
    match header {
        Some(index) => Ok(rows_from_grid(grid, index)),
        None => Err(Error::InvalidInput(format!(
            "no header with columns {}",
            required.join(", ")
        ))),
    }
}

fn parse_eligibility(value: &str, row: usize) -> Result<Eligibility> {
    Eligibility::parse(value).ok_or_else(|| {
        Error::InvalidInput(format!("row {}: unknown eligibility '{}'", row, value))
    })
}

/// Read predictions (`patient_id, trial_id, prediction, confidence, triage`)
///
/// Rows without a patient or trial id are skipped.
pub fn read_trial_predictions(grid: &[Vec<String>]) -> Result<Vec<PatientTrials>> {
    let rows = header_rows(
        grid,
        &[
            PATIENT_COLUMN,
            TRIAL_COLUMN,
            PREDICTION_COLUMN,
            CONFIDENCE_COLUMN,
        ],
    )?;

    let mut parsed = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let (Some(patient), Some(trial)) =
            (lookup(row, &[PATIENT_COLUMN]), lookup(row, &[TRIAL_COLUMN]))
        else {
            log::debug!("Skipping trial prediction row {} without ids", i + 1);
            continue;
        };
        let prediction = parse_eligibility(lookup(row, &[PREDICTION_COLUMN]).unwrap_or(""), i + 1)?;
        let raw_confidence = lookup(row, &[CONFIDENCE_COLUMN]).unwrap_or("");
        let confidence: f64 = raw_confidence.replace(',', ".").parse().map_err(|_| {
            Error::InvalidInput(format!(
                "row {}: confidence '{}' is not a number",
                i + 1,
                raw_confidence
            ))
        })?;
        let triage = lookup(row, &[TRIAGE_COLUMN]).unwrap_or("").to_string();

        parsed.push((
            patient.to_string(),
            TrialPrediction::new(trial, prediction, confidence, triage),
        ));
    }
    Ok(group_by_patient(parsed))
}

/// Read ground-truth labels (`patient_id, trial_id, ground_truth`)
pub fn read_trial_labels(grid: &[Vec<String>]) -> Result<Vec<TrialLabel>> {
    let rows = header_rows(grid, &[PATIENT_COLUMN, TRIAL_COLUMN, GROUND_TRUTH_COLUMN])?;

    let mut labels = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let (Some(patient), Some(trial)) =
            (lookup(row, &[PATIENT_COLUMN]), lookup(row, &[TRIAL_COLUMN]))
        else {
            continue;
        };
        let gt = parse_eligibility(lookup(row, &[GROUND_TRUTH_COLUMN]).unwrap_or(""), i + 1)?;
        labels.push(TrialLabel::new(patient, trial, gt));
    }
    Ok(labels)
}

/// Read both files and score them
pub fn evaluate_trial_files<P: AsRef<Path>, Q: AsRef<Path>>(
    predictions: P,
    ground_truth: Q,
) -> Result<TrialEvaluationReport> {
    let patients = read_trial_predictions(&io::read_grid(predictions)?)?;
    let labels = read_trial_labels(&io::read_grid(ground_truth)?)?;
    evaluate_trials(&patients, &labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Eligibility::*;

    #[test]
    fn test_group_by_patient_keeps_first_appearance_order() {
        let groups = group_by_patient(vec![
            ("p2".to_string(), TrialPrediction::new("A", Eligible, 0.9, "auto")),
            ("p1".to_string(), TrialPrediction::new("B", Eligible, 0.9, "auto")),
            ("p2".to_string(), TrialPrediction::new("C", Unknown, 0.4, "review")),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].patient_id, "p2");
        assert_eq!(groups[0].trials.len(), 2);
        assert_eq!(groups[1].patient_id, "p1");
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let labels = vec![TrialLabel::new("p1", "A", Eligible)];
        assert!(matches!(
            evaluate_trials(&[], &labels),
            Err(Error::EmptyData(_))
        ));
        let patients = group_by_patient(vec![(
            "p1".to_string(),
            TrialPrediction::new("A", Eligible, 0.9, "auto"),
        )]);
        assert!(matches!(
            evaluate_trials(&patients, &[]),
            Err(Error::EmptyData(_))
        ));
    }

    #[test]
    fn test_bad_confidence_is_an_error() {
        let grid: Vec<Vec<String>> = [
            ["patient_id", "trial_id", "prediction", "confidence", "triage"],
            ["p1", "A", "eligible", "high", "auto"],
        ]
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
        assert!(matches!(
            read_trial_predictions(&grid),
            Err(Error::InvalidInput(_))
        ));
    }
}
