//! `sitediary-recon`: duplicate detection and coverage over diary entries.
//!
//! Pure engine crate: receives loaded entries, returns derived reports.
//! No store or file IO dependencies.

pub mod aggregate;
pub mod config;
pub mod coverage;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod matcher;
pub mod model;
pub mod rollup;

pub use config::{CoverageConfig, DedupConfig, ReconConfig, DEFAULT_FUZZY_THRESHOLD};
pub use coverage::find_gaps;
pub use dedup::find_duplicates;
pub use engine::{dedup_report, run};
pub use error::ReconError;
pub use model::{
    ActivityRollup, CoverageGap, DailySummary, DedupReport, DuplicateCluster, MatchBasis, MemberRow,
    NameVariantRollup, ReconResult,
};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use sitediary_core::{DiaryEntry, EntryCandidate, SourceKind};

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub fn entry(id: i64, kind: SourceKind, day: &str, person: &str, activity: &str, minutes: i64) -> DiaryEntry {
        DiaryEntry::from_candidate(
            id,
            EntryCandidate {
                source_kind: kind,
                source_document: format!("{kind}/report.xlsx::Sheet1"),
                row_index: id as u32 + 1,
                entry_date: date(day),
                person: person.into(),
                activity_text: activity.into(),
                duration_minutes: minutes,
                raw_row_hash: format!("sha256:{id:04}"),
            },
        )
    }

    pub fn entry_in(id: i64, document: &str, day: &str, activity: &str) -> DiaryEntry {
        let mut e = entry(id, SourceKind::Client, day, "john doe", activity, 60);
        e.source_document = document.into();
        e
    }
}
