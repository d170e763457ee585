//! Shape of the verdicts the external audit collaborator writes back.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Pass,
    Flag,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Flag => "FLAG",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Ok(Self::Pass),
            "FLAG" => Ok(Self::Flag),
            other => Err(format!("unknown audit status '{other}'")),
        }
    }
}

/// Status + notes derived from a reviewer's free-text answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditVerdict {
    pub status: AuditStatus,
    pub notes: String,
}

impl AuditVerdict {
    /// Answers starting with "PASS" pass with no notes; anything else is
    /// flagged and the answer kept as notes.
    pub fn from_response(answer: &str) -> Self {
        let cleaned = answer.trim();
        if cleaned.is_empty() {
            return Self { status: AuditStatus::Flag, notes: "[no response]".into() };
        }
        if cleaned.to_ascii_uppercase().starts_with("PASS") {
            return Self { status: AuditStatus::Pass, notes: String::new() };
        }
        Self { status: AuditStatus::Flag, notes: cleaned.to_string() }
    }
}

/// One write-back tuple, applied by entry id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResult {
    pub entry_id: i64,
    pub status: AuditStatus,
    pub model: String,
    /// RFC 3339.
    pub timestamp: String,
    pub notes: String,
}

impl AuditResult {
    pub fn new(entry_id: i64, verdict: AuditVerdict, model: impl Into<String>) -> Self {
        Self {
            entry_id,
            status: verdict.status,
            model: model.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            notes: verdict.notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpret_responses() {
        let v = AuditVerdict::from_response("PASS - consistent with diary");
        assert_eq!(v.status, AuditStatus::Pass);
        assert!(v.notes.is_empty());

        let v = AuditVerdict::from_response("  ");
        assert_eq!(v.status, AuditStatus::Flag);
        assert_eq!(v.notes, "[no response]");

        let v = AuditVerdict::from_response("Hours look inflated for a trenching task.");
        assert_eq!(v.status, AuditStatus::Flag);
        assert_eq!(v.notes, "Hours look inflated for a trenching task.");
    }

    #[test]
    fn status_round_trip_through_text() {
        assert_eq!("pass".parse::<AuditStatus>().unwrap(), AuditStatus::Pass);
        assert_eq!(AuditStatus::Flag.to_string(), "FLAG");
        assert!("maybe".parse::<AuditStatus>().is_err());
    }
}
