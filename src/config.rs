//! Evaluation configuration
//!
//! Holds the matching policy (month tolerance, imaging-event pattern,
//! baseline marker) together with the sheet-reading knobs. A configuration
//! can be built in code through [`EvaluationConfigBuilder`] or loaded from a
//! TOML, YAML or JSON file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default month tolerance of the event matcher
pub const DEFAULT_TOLERANCE_MONTHS: u32 = 1;

/// Default pattern recognising imaging (CT) events
pub const DEFAULT_IMAGING_PATTERN: &str = "tc|tac";

/// Default ground-truth RECIST value that marks a baseline scan
pub const DEFAULT_BASELINE_MARKER: &str = "BASELINE";

/// Configuration for an evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Maximum distance, in calendar months, between a ground-truth event
    /// and the prediction it may consume
    pub tolerance_months: u32,
    /// Case-insensitive regex applied to event labels to select imaging
    /// events for RECIST pairing
    pub imaging_pattern: String,
    /// Ground-truth RECIST label excluded from pairing (compared upper-cased)
    pub baseline_marker: String,
    /// Number of leading sheet rows searched for the header line
    pub header_scan_rows: usize,
    /// Parse ambiguous `a/b/yyyy` dates as day/month instead of month/day
    pub day_first: bool,
    /// Maximum number of models in a comparison table
    pub max_models: usize,
    /// Decimal places kept in exported metric values
    pub decimals: u32,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            tolerance_months: DEFAULT_TOLERANCE_MONTHS,
            imaging_pattern: DEFAULT_IMAGING_PATTERN.to_string(),
            baseline_marker: DEFAULT_BASELINE_MARKER.to_string(),
            header_scan_rows: 20,
            day_first: false,
            max_models: 4,
            decimals: 4,
        }
    }
}

impl EvaluationConfig {
    /// Load a configuration file, choosing the format from its extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let config: EvaluationConfig = match extension.as_str() {
            "toml" => toml::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            other => {
                return Err(Error::UnsupportedFormat(format!(
                    "configuration file extension '{}'",
                    other
                )))
            }
        };

        log::debug!("Loaded evaluation config from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Location of the per-user configuration file, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("clineval").join("config.toml"))
    }

    /// Load the per-user configuration file, or the defaults when none exists
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Check the values that would otherwise fail later in the run
    pub fn validate(&self) -> Result<()> {
        if self.header_scan_rows == 0 {
            return Err(Error::Config(
                "header_scan_rows must be at least 1".to_string(),
            ));
        }
        if self.max_models < 2 {
            return Err(Error::Config("max_models must be at least 2".to_string()));
        }
        regex::RegexBuilder::new(&self.imaging_pattern)
            .case_insensitive(true)
            .build()?;
        Ok(())
    }
}

/// Builder for EvaluationConfig
pub struct EvaluationConfigBuilder {
    config: EvaluationConfig,
}

impl EvaluationConfigBuilder {
    /// Creates a new builder
    pub fn new() -> Self {
        EvaluationConfigBuilder {
            config: EvaluationConfig::default(),
        }
    }

    /// Sets the month tolerance
    pub fn tolerance_months(mut self, months: u32) -> Self {
        self.config.tolerance_months = months;
        self
    }

    /// Sets the imaging-event pattern
    pub fn imaging_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.imaging_pattern = pattern.into();
        self
    }

    /// Sets the baseline marker
    pub fn baseline_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.baseline_marker = marker.into();
        self
    }

    /// Sets how many leading rows are searched for the header
    pub fn header_scan_rows(mut self, rows: usize) -> Self {
        self.config.header_scan_rows = rows;
        self
    }

    /// Sets day-first parsing of slash dates
    pub fn day_first(mut self, day_first: bool) -> Self {
        self.config.day_first = day_first;
        self
    }

    /// Sets the comparison table model cap
    pub fn max_models(mut self, max_models: usize) -> Self {
        self.config.max_models = max_models;
        self
    }

    /// Sets exported decimal places
    pub fn decimals(mut self, decimals: u32) -> Self {
        self.config.decimals = decimals;
        self
    }

    /// Builds and validates the config
    pub fn build(self) -> Result<EvaluationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for EvaluationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EvaluationConfig::default();
        assert_eq!(config.tolerance_months, 1);
        assert_eq!(config.imaging_pattern, "tc|tac");
        assert_eq!(config.baseline_marker, "BASELINE");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_bad_pattern() {
        let result = EvaluationConfigBuilder::new().imaging_pattern("(tc").build();
        assert!(matches!(result, Err(Error::InvalidRegex(_))));
    }

    #[test]
    fn test_from_toml_file_keeps_defaults_for_missing_keys() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "tolerance_months = 2").unwrap();
        writeln!(file, "day_first = true").unwrap();

        let config = EvaluationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.tolerance_months, 2);
        assert!(config.day_first);
        assert_eq!(config.max_models, 4);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "baseline_marker: BL").unwrap();

        let config = EvaluationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.baseline_marker, "BL");
        assert_eq!(config.tolerance_months, 1);
    }

    #[test]
    fn test_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            EvaluationConfig::from_file(file.path()),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
