use serde::{Deserialize, Serialize};
use sitediary_core::SourceKind;

use crate::error::ReconError;

/// Cross-source similarity cutoff used when nothing else is configured.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub coverage: CoverageConfig,
}

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.dedup.validate()?;
        self.coverage.validate()
    }
}

// ---------------------------------------------------------------------------
// Dedup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Inclusive lower bound on activity-text similarity for a
    /// client/supervisor pair to count as the same event.
    pub fuzzy_threshold: f64,
    /// Treat "j. doe" and "john doe" as the same person when correlating
    /// across sources.
    pub compare_person_initials: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            compare_person_initials: true,
        }
    }
}

impl DedupConfig {
    pub fn with_threshold(threshold: f64) -> Self {
        Self { fuzzy_threshold: threshold, ..Self::default() }
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !self.fuzzy_threshold.is_finite() || !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(ReconError::ConfigValidation(format!(
                "dedup.fuzzy_threshold must be between 0.0 and 1.0, got {}",
                self.fuzzy_threshold
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Kinds that should report on every date in range.
    pub expected: Vec<SourceKind>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self { expected: SourceKind::ALL.to_vec() }
    }
}

impl CoverageConfig {
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.expected.is_empty() {
            return Err(ReconError::ConfigValidation(
                "coverage.expected must name at least one source kind".into(),
            ));
        }
        for (i, kind) in self.expected.iter().enumerate() {
            if self.expected[..i].contains(kind) {
                return Err(ReconError::ConfigValidation(format!(
                    "coverage.expected lists '{kind}' twice"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_all_defaults() {
        let config = ReconConfig::from_toml("").unwrap();
        assert_eq!(config.dedup.fuzzy_threshold, DEFAULT_FUZZY_THRESHOLD);
        assert!(config.dedup.compare_person_initials);
        assert_eq!(config.coverage.expected, vec![SourceKind::Client, SourceKind::Supervisor]);
    }

    #[test]
    fn parse_overrides() {
        let config = ReconConfig::from_toml(
            r#"
[dedup]
fuzzy_threshold = 0.9
compare_person_initials = false

[coverage]
expected = ["supervisor"]
"#,
        )
        .unwrap();
        assert_eq!(config.dedup.fuzzy_threshold, 0.9);
        assert!(!config.dedup.compare_person_initials);
        assert_eq!(config.coverage.expected, vec![SourceKind::Supervisor]);
    }

    #[test]
    fn threshold_out_of_range() {
        let err = ReconConfig::from_toml("[dedup]\nfuzzy_threshold = 1.5\n").unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(_)));
        assert!(DedupConfig::with_threshold(f64::NAN).validate().is_err());
        assert!(DedupConfig::with_threshold(1.0).validate().is_ok());
    }

    #[test]
    fn coverage_validation() {
        assert!(ReconConfig::from_toml("[coverage]\nexpected = []\n").is_err());
        assert!(ReconConfig::from_toml("[coverage]\nexpected = [\"client\", \"client\"]\n").is_err());
        let err = ReconConfig::from_toml("[coverage]\nexpected = [\"contractor\"]\n").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}
