//! Month-tolerant event matcher
//!
//! Predictions and ground truth are grouped by [`MatchKey`]. For every key
//! the predictions form a multiset of months; ground-truth items, taken in
//! input order, each consume at most one prediction within the tolerance
//! window, preferring the exact month, then one month earlier, then one month
//! later (and so on for wider tolerances). Matching never crosses keys.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::config::EvaluationConfig;
use crate::error::Result;
use crate::metrics::{Counts, RecistPair};
use crate::record::{compare_labels, MatchKey, NormalizedRecord};
use crate::temporal::{DateNormalizer, MonthIndex};

lazy_static! {
    static ref DEFAULT_IMAGING: Regex = RegexBuilder::new(crate::config::DEFAULT_IMAGING_PATTERN)
        .case_insensitive(true)
        .build()
        .unwrap();
}

/// Matching rules of a run
#[derive(Debug, Clone)]
pub struct MatchPolicy {
    tolerance_months: u32,
    imaging: Regex,
    baseline_marker: String,
}

impl MatchPolicy {
    pub fn new(config: &EvaluationConfig) -> Result<Self> {
        let imaging = RegexBuilder::new(&config.imaging_pattern)
            .case_insensitive(true)
            .build()?;
        Ok(MatchPolicy {
            tolerance_months: config.tolerance_months,
            imaging,
            baseline_marker: config.baseline_marker.trim().to_uppercase(),
        })
    }

    /// Default policy with a different tolerance
    pub fn with_tolerance(tolerance_months: u32) -> Self {
        let mut policy = Self::default();
        policy.tolerance_months = tolerance_months;
        policy
    }

    pub fn tolerance_months(&self) -> u32 {
        self.tolerance_months
    }

    /// Month offsets in the order they are tried: `0, -1, +1, -2, +2, ...`
    pub fn offsets(&self) -> Vec<i32> {
        let mut offsets = vec![0];
        for step in 1..=self.tolerance_months as i32 {
            offsets.push(-step);
            offsets.push(step);
        }
        offsets
    }

    /// Whether an event label denotes an imaging (CT) event
    pub fn is_imaging_event(&self, event_label: &str) -> bool {
        self.imaging.is_match(event_label)
    }

    /// Whether a ground-truth RECIST value takes part in label comparison
    fn is_comparable_label(&self, label: &str) -> bool {
        !label.is_empty() && label != self.baseline_marker
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy {
            tolerance_months: crate::config::DEFAULT_TOLERANCE_MONTHS,
            imaging: DEFAULT_IMAGING.clone(),
            baseline_marker: crate::config::DEFAULT_BASELINE_MARKER.to_string(),
        }
    }
}

/// One ground-truth item paired with the prediction it consumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMatch {
    pub key: MatchKey,
    /// Position of the ground-truth record in the input slice
    pub ground_truth_index: usize,
    /// Position of the consumed prediction in the input slice
    pub prediction_index: usize,
    /// Month of the consumed prediction minus the ground-truth month
    pub month_offset: i32,
}

/// Outcome for one `(id, event)` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOutcome {
    pub key: MatchKey,
    pub predictions: usize,
    pub ground_truth: usize,
    pub counts: Counts,
}

/// Per-event totals and counts
///
/// `fp` and `fn` are `predictions - tp` and `ground_truth - tp` clamped at
/// zero, computed from event-level totals across all identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub event: String,
    pub predictions: usize,
    pub ground_truth: usize,
    pub counts: Counts,
}

/// Everything the matcher produced for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Sums over all keys
    pub overall: Counts,
    /// Sorted by key
    pub per_key: Vec<KeyOutcome>,
    /// Sorted by event label collation
    pub per_event: Vec<EventCounts>,
    /// True positives in ground-truth order
    pub matches: Vec<EventMatch>,
    /// RECIST comparison pairs from matched imaging events
    pub recist_pairs: Vec<RecistPair>,
    /// Prediction events whose id has no ground truth
    pub dropped_predictions: usize,
    /// Ground-truth events whose id has no predictions
    pub dropped_ground_truth: usize,
    /// Prediction events without a usable month
    pub unparsed_predictions: usize,
    /// Ground-truth events without a usable month
    pub unparsed_ground_truth: usize,
}

impl MatchOutcome {
    pub fn key(&self, key: &MatchKey) -> Option<&KeyOutcome> {
        self.per_key
            .binary_search_by(|k| k.key.cmp(key))
            .ok()
            .map(|i| &self.per_key[i])
    }

    pub fn event(&self, event: &str) -> Option<&EventCounts> {
        self.per_event.iter().find(|e| e.event == event)
    }
}

#[derive(Default)]
struct KeyState {
    months: BTreeMap<MonthIndex, VecDeque<usize>>,
    predictions: usize,
    ground_truth: usize,
    tp: usize,
}

#[derive(Default)]
struct EventState {
    predictions: usize,
    ground_truth: usize,
    tp: usize,
}

/// Matches predictions against ground truth under a [`MatchPolicy`]
#[derive(Debug, Clone, Default)]
pub struct EventMatcher {
    policy: MatchPolicy,
    dates: DateNormalizer,
}

impl EventMatcher {
    pub fn new(policy: MatchPolicy, dates: DateNormalizer) -> Self {
        EventMatcher { policy, dates }
    }

    pub fn from_config(config: &EvaluationConfig) -> Result<Self> {
        Ok(Self::new(
            MatchPolicy::new(config)?,
            DateNormalizer::new(config.day_first),
        ))
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Run the matcher
    ///
    /// Records without id or event label are ignored. Only identifiers
    /// present on both sides are matched; the rest are counted as dropped.
    pub fn match_events(
        &self,
        predictions: &[NormalizedRecord],
        ground_truth: &[NormalizedRecord],
    ) -> MatchOutcome {
        let ids_of = |records: &[NormalizedRecord]| -> BTreeSet<String> {
            records
                .iter()
                .filter(|r| r.is_usable())
                .map(|r| r.id.clone())
                .collect()
        };
        let pred_ids = ids_of(predictions);
        let gt_ids = ids_of(ground_truth);
        let common: BTreeSet<&String> = pred_ids.intersection(&gt_ids).collect();

        let mut outcome = MatchOutcome::default();
        let mut keys: BTreeMap<MatchKey, KeyState> = BTreeMap::new();
        let mut events: BTreeMap<String, EventState> = BTreeMap::new();

        for (index, record) in predictions.iter().enumerate() {
            if !record.is_usable() {
                continue;
            }
            if !common.contains(&record.id) {
                outcome.dropped_predictions += 1;
                continue;
            }
            let month = match self.dates.month_index(&record.date) {
                Some(month) => month,
                None => {
                    outcome.unparsed_predictions += 1;
                    continue;
                }
            };

            let state = keys.entry(record.match_key()).or_default();
            state.months.entry(month).or_default().push_back(index);
            state.predictions += 1;
            events.entry(record.event_label.clone()).or_default().predictions += 1;
        }

        let offsets = self.policy.offsets();

        for (gt_index, record) in ground_truth.iter().enumerate() {
            if !record.is_usable() {
                continue;
            }
            if !common.contains(&record.id) {
                outcome.dropped_ground_truth += 1;
                continue;
            }
            let month = match self.dates.month_index(&record.date) {
                Some(month) => month,
                None => {
                    outcome.unparsed_ground_truth += 1;
                    continue;
                }
            };

            let key = record.match_key();
            let event = events.entry(record.event_label.clone()).or_default();
            event.ground_truth += 1;
            let state = keys.entry(key.clone()).or_default();
            state.ground_truth += 1;

            let consumed = offsets.iter().find_map(|&offset| {
                state
                    .months
                    .get_mut(&month.offset(offset))
                    .and_then(VecDeque::pop_front)
                    .map(|pred_index| (offset, pred_index))
            });

            let (month_offset, prediction_index) = match consumed {
                Some(found) => found,
                None => continue,
            };

            state.tp += 1;
            event.tp += 1;

            if self.policy.is_imaging_event(&record.event_label) {
                let gt_label = record
                    .recist_label
                    .as_deref()
                    .unwrap_or("")
                    .trim()
                    .to_uppercase();
                if self.policy.is_comparable_label(&gt_label) {
                    let predicted = predictions[prediction_index]
                        .recist_label
                        .as_deref()
                        .map(|l| l.trim().to_uppercase())
                        .filter(|l| !l.is_empty())
                        .unwrap_or_else(|| "NE".to_string());
                    outcome.recist_pairs.push(RecistPair::new(gt_label, predicted));
                }
            }

            outcome.matches.push(EventMatch {
                key,
                ground_truth_index: gt_index,
                prediction_index,
                month_offset,
            });
        }

        outcome.per_key = keys
            .into_iter()
            .map(|(key, state)| {
                let counts = Counts::new(
                    state.tp,
                    state.predictions - state.tp,
                    state.ground_truth - state.tp,
                );
                KeyOutcome {
                    key,
                    predictions: state.predictions,
                    ground_truth: state.ground_truth,
                    counts,
                }
            })
            .collect();
        outcome.overall = outcome.per_key.iter().map(|k| k.counts).sum();

        let mut per_event: Vec<EventCounts> = events
            .into_iter()
            .map(|(event, state)| EventCounts {
                counts: Counts::new(
                    state.tp,
                    state.predictions.saturating_sub(state.tp),
                    state.ground_truth.saturating_sub(state.tp),
                ),
                event,
                predictions: state.predictions,
                ground_truth: state.ground_truth,
            })
            .collect();
        per_event.sort_by(|a, b| compare_labels(&a.event, &b.event));
        outcome.per_event = per_event;

        log::debug!(
            "Matched with ±{} months: tp={} fp={} fn={} ({} RECIST pairs)",
            self.policy.tolerance_months,
            outcome.overall.tp,
            outcome.overall.fp,
            outcome.overall.fn_,
            outcome.recist_pairs.len()
        );

        outcome
    }
}

/// Match with the default policy and the given tolerance
pub fn match_events(
    predictions: &[NormalizedRecord],
    ground_truth: &[NormalizedRecord],
    tolerance_months: u32,
) -> MatchOutcome {
    EventMatcher::new(
        MatchPolicy::with_tolerance(tolerance_months),
        DateNormalizer::default(),
    )
    .match_events(predictions, ground_truth)
}
