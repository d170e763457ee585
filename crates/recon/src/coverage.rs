use std::collections::BTreeSet;

use chrono::NaiveDate;
use sitediary_core::{DiaryEntry, SourceKind};

use crate::config::CoverageConfig;
use crate::model::CoverageGap;

/// Earliest and latest entry dates, if any.
pub fn date_range(entries: &[DiaryEntry]) -> Option<(NaiveDate, NaiveDate)> {
    let first = entries.iter().map(|e| e.entry_date).min()?;
    let last = entries.iter().map(|e| e.entry_date).max()?;
    Some((first, last))
}

/// Every `(date, kind)` in the ingested range with no entries, for each
/// expected kind. Dates with no entries at all are gaps for every kind.
pub fn find_gaps(entries: &[DiaryEntry], config: &CoverageConfig) -> Vec<CoverageGap> {
    let Some((first, last)) = date_range(entries) else {
        return Vec::new();
    };
    let covered: BTreeSet<(NaiveDate, SourceKind)> =
        entries.iter().map(|e| (e.entry_date, e.source_kind)).collect();

    let mut gaps = Vec::new();
    for date in first.iter_days().take_while(|d| *d <= last) {
        for &kind in &config.expected {
            if !covered.contains(&(date, kind)) {
                gaps.push(CoverageGap { date, source_kind: kind });
            }
        }
    }
    gaps.sort();
    log::info!("coverage: {} gap(s) between {first} and {last}", gaps.len());
    gaps
}
