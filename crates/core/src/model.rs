use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::audit::AuditStatus;
use crate::error::NormalizeError;

// ---------------------------------------------------------------------------
// Source kind
// ---------------------------------------------------------------------------

/// Which population recorded an entry. Partitions every dedup decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Client,
    Supervisor,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Client, SourceKind::Supervisor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Supervisor => "supervisor",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "supervisor" => Ok(Self::Supervisor),
            other => Err(NormalizeError::SourceKind(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A normalized row produced by an adapter, not yet persisted.
///
/// `(source_document, raw_row_hash)` is the identity key used for idempotent
/// re-ingestion; `row_index` only drives deterministic insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryCandidate {
    pub source_kind: SourceKind,
    pub source_document: String,
    /// 1-based row number inside the sheet.
    pub row_index: u32,
    pub entry_date: NaiveDate,
    pub person: String,
    pub activity_text: String,
    pub duration_minutes: i64,
    pub raw_row_hash: String,
}

impl EntryCandidate {
    pub fn identity(&self) -> (&str, &str) {
        (&self.source_document, &self.raw_row_hash)
    }
}

/// A persisted diary entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiaryEntry {
    pub entry_id: i64,
    pub source_kind: SourceKind,
    pub source_document: String,
    pub row_index: u32,
    pub entry_date: NaiveDate,
    pub person: String,
    pub activity_text: String,
    pub duration_minutes: i64,
    pub raw_row_hash: String,
    pub audit_status: Option<AuditStatus>,
    pub audit_model: Option<String>,
    pub audit_timestamp: Option<String>,
    pub audit_notes: Option<String>,
}

impl DiaryEntry {
    pub fn hours(&self) -> f64 {
        self.duration_minutes as f64 / 60.0
    }

    pub fn is_audited(&self) -> bool {
        self.audit_status.is_some()
    }

    /// Build an un-audited entry from a candidate. Used by the store and by tests.
    pub fn from_candidate(entry_id: i64, c: EntryCandidate) -> Self {
        Self {
            entry_id,
            source_kind: c.source_kind,
            source_document: c.source_document,
            row_index: c.row_index,
            entry_date: c.entry_date,
            person: c.person,
            activity_text: c.activity_text,
            duration_minutes: c.duration_minutes,
            raw_row_hash: c.raw_row_hash,
            audit_status: None,
            audit_model: None,
            audit_timestamp: None,
            audit_notes: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Rejections + warnings
// ---------------------------------------------------------------------------

/// A single row that could not be normalized. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    pub source_document: String,
    pub row_index: u32,
    pub reason: String,
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row {}: {}", self.source_document, self.row_index, self.reason)
    }
}

/// A whole file or sheet that was skipped (unreadable, no header found).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileWarning {
    pub source: String,
    pub reason: String,
}

impl fmt::Display for FileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_parse_and_display() {
        assert_eq!("Client".parse::<SourceKind>().unwrap(), SourceKind::Client);
        assert_eq!(" supervisor ".parse::<SourceKind>().unwrap(), SourceKind::Supervisor);
        assert!("contractor".parse::<SourceKind>().is_err());
        assert_eq!(SourceKind::Supervisor.to_string(), "supervisor");
    }

    #[test]
    fn hours_from_minutes() {
        let c = EntryCandidate {
            source_kind: SourceKind::Client,
            source_document: "a.xlsx::001".into(),
            row_index: 3,
            entry_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            person: "john doe".into(),
            activity_text: "Site inspection".into(),
            duration_minutes: 90,
            raw_row_hash: "sha256:00".into(),
        };
        let e = DiaryEntry::from_candidate(7, c);
        assert_eq!(e.entry_id, 7);
        assert!((e.hours() - 1.5).abs() < f64::EPSILON);
        assert!(!e.is_audited());
    }
}
