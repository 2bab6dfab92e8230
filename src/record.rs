//! Canonical records shared by the normalizer, the matcher and the reports

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// One timeline event read from a predictions or ground-truth sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Patient or document identifier
    pub id: String,
    /// `YYYY-MM-DD` when the cell could be resolved, the raw text otherwise
    pub date: String,
    /// Event category, compared exactly
    pub event_label: String,
    /// RECIST response as written in the sheet, if any
    pub recist_label: Option<String>,
}

impl NormalizedRecord {
    /// Create a record without a RECIST label
    pub fn new(
        id: impl Into<String>,
        date: impl Into<String>,
        event_label: impl Into<String>,
    ) -> Self {
        NormalizedRecord {
            id: id.into(),
            date: date.into(),
            event_label: event_label.into(),
            recist_label: None,
        }
    }

    /// Attach a RECIST label; blank labels are stored as `None`
    pub fn with_recist(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        let trimmed = label.trim();
        self.recist_label = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Key used to group this record for matching
    pub fn match_key(&self) -> MatchKey {
        MatchKey::new(self.id.clone(), self.event_label.clone())
    }

    /// A record can take part in matching only with an id and an event
    pub fn is_usable(&self) -> bool {
        !self.id.trim().is_empty() && !self.event_label.trim().is_empty()
    }
}

/// `(id, event_label)` pair scoping the tolerance window
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchKey {
    pub id: String,
    pub event_label: String,
}

impl MatchKey {
    pub fn new(id: impl Into<String>, event_label: impl Into<String>) -> Self {
        MatchKey {
            id: id.into(),
            event_label: event_label.into(),
        }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.id, self.event_label)
    }
}

/// RECIST response categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecistLabel {
    /// Complete response
    CR,
    /// Partial response
    PR,
    /// Stable disease
    SD,
    /// Progressive disease
    PD,
    /// Not evaluable
    NE,
}

impl RecistLabel {
    /// All labels in matrix order
    pub const ALL: [RecistLabel; 5] = [
        RecistLabel::CR,
        RecistLabel::PR,
        RecistLabel::SD,
        RecistLabel::PD,
        RecistLabel::NE,
    ];

    /// Case-insensitive parse of a known label
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CR" => Some(RecistLabel::CR),
            "PR" => Some(RecistLabel::PR),
            "SD" => Some(RecistLabel::SD),
            "PD" => Some(RecistLabel::PD),
            "NE" => Some(RecistLabel::NE),
            _ => None,
        }
    }

    /// Parse, sending anything outside the label set to `NE`
    pub fn coerce(s: &str) -> Self {
        Self::parse(s).unwrap_or(RecistLabel::NE)
    }

    /// Position in [`RecistLabel::ALL`]
    pub fn index(&self) -> usize {
        match self {
            RecistLabel::CR => 0,
            RecistLabel::PR => 1,
            RecistLabel::SD => 2,
            RecistLabel::PD => 3,
            RecistLabel::NE => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecistLabel::CR => "CR",
            RecistLabel::PR => "PR",
            RecistLabel::SD => "SD",
            RecistLabel::PD => "PD",
            RecistLabel::NE => "NE",
        }
    }
}

impl fmt::Display for RecistLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort key for event labels: case-insensitive, accents folded
pub fn collation_key(label: &str) -> String {
    label
        .chars()
        .flat_map(|c| c.to_lowercase())
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ä' | 'ã' => 'a',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Compare event labels by collation key, raw text breaking ties
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}
