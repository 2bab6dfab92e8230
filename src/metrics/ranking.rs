//! Trial ranking and triage metrics
//!
//! A patient's candidate trials are ranked by predicted eligibility, then
//! by confidence. Ranking quality is read as a top-k hit on the
//! ground-truth trial and as the confidence margin of that trial over the
//! best competitor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::eligibility::Eligibility;

/// One predicted trial for a patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialPrediction {
    pub trial_id: String,
    pub prediction: Eligibility,
    pub confidence: f64,
    /// Triage routing, e.g. `auto`, `review` or `human_required`
    pub triage: String,
}

impl TrialPrediction {
    pub fn new(
        trial_id: impl Into<String>,
        prediction: Eligibility,
        confidence: f64,
        triage: impl Into<String>,
    ) -> Self {
        TrialPrediction {
            trial_id: trial_id.into(),
            prediction,
            confidence,
            triage: triage.into(),
        }
    }
}

/// Trials ordered by eligibility priority, then confidence, both descending
///
/// Ties keep their input order.
pub fn rank_trials(trials: &[TrialPrediction]) -> Vec<TrialPrediction> {
    let mut ranked = trials.to_vec();
    ranked.sort_by(|a, b| {
        b.prediction
            .priority()
            .cmp(&a.prediction.priority())
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });
    ranked
}

/// Whether the ground-truth trial is among the first `k` ranked trials
pub fn top_k_hit(ranked: &[TrialPrediction], gt_trial_id: &str, k: usize) -> bool {
    ranked.iter().take(k).any(|t| t.trial_id == gt_trial_id)
}

/// Confidence of the ground-truth trial minus the best other confidence
///
/// `None` when the ground-truth trial is absent or has no competitor.
pub fn confidence_separation(ranked: &[TrialPrediction], gt_trial_id: &str) -> Option<f64> {
    let gt = ranked.iter().find(|t| t.trial_id == gt_trial_id)?;
    ranked
        .iter()
        .filter(|t| t.trial_id != gt_trial_id)
        .map(|t| t.confidence)
        .reduce(f64::max)
        .map(|best_other| gt.confidence - best_other)
}

/// Count of trials per triage value
pub fn triage_distribution<'a, I>(trials: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a TrialPrediction>,
{
    let mut counts = BTreeMap::new();
    for trial in trials {
        *counts.entry(trial.triage.clone()).or_insert(0) += 1;
    }
    counts
}

/// Share of trials predicted eligible, 0 for an empty list
///
/// Meant for patients with no eligible ground-truth trial, where every
/// `eligible` prediction is a false positive.
pub fn false_positive_rate(trials: &[TrialPrediction]) -> f64 {
    if trials.is_empty() {
        return 0.0;
    }
    let fp = trials
        .iter()
        .filter(|t| t.prediction == Eligibility::Eligible)
        .count();
    fp as f64 / trials.len() as f64
}
