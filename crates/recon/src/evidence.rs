use std::collections::BTreeMap;

use chrono::NaiveDate;
use sitediary_core::{DiaryEntry, SourceKind};

use crate::coverage::date_range;
use crate::model::{CoverageGap, DailySummary, DedupReport, ReconSummary};

/// Compute summary statistics from a finished pass.
pub fn compute_summary(entries: &[DiaryEntry], dedup: &DedupReport, gaps: &[CoverageGap]) -> ReconSummary {
    let mut basis_counts: BTreeMap<String, usize> = BTreeMap::new();
    for c in &dedup.clusters {
        *basis_counts.entry(c.match_basis.to_string()).or_insert(0) += 1;
    }
    let range = date_range(entries);

    ReconSummary {
        entries: entries.len(),
        first_date: range.map(|r| r.0),
        last_date: range.map(|r| r.1),
        clusters: dedup.clusters.len(),
        cross_source_clusters: dedup.clusters.iter().filter(|c| c.cross_source).count(),
        duplicate_entries: dedup.duplicate_entries(),
        basis_counts,
        coverage_gaps: gaps.len(),
    }
}

/// One row per calendar date in the ingested range.
pub fn daily_summaries(entries: &[DiaryEntry], dedup: &DedupReport, gaps: &[CoverageGap]) -> Vec<DailySummary> {
    let Some((first, last)) = date_range(entries) else {
        return Vec::new();
    };

    let mut days: BTreeMap<NaiveDate, DailySummary> = first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| {
            (
                date,
                DailySummary {
                    date,
                    client_entries: 0,
                    client_hours: 0.0,
                    supervisor_entries: 0,
                    supervisor_hours: 0.0,
                    duplicate_clusters: 0,
                    missing: Vec::new(),
                },
            )
        })
        .collect();

    // Minutes are summed first so hours carry no float drift.
    let mut minutes: BTreeMap<(NaiveDate, SourceKind), i64> = BTreeMap::new();
    for e in entries {
        let Some(day) = days.get_mut(&e.entry_date) else { continue };
        match e.source_kind {
            SourceKind::Client => day.client_entries += 1,
            SourceKind::Supervisor => day.supervisor_entries += 1,
        }
        *minutes.entry((e.entry_date, e.source_kind)).or_default() += e.duration_minutes;
    }
    for ((date, kind), total) in minutes {
        if let Some(day) = days.get_mut(&date) {
            let hours = total as f64 / 60.0;
            match kind {
                SourceKind::Client => day.client_hours = hours,
                SourceKind::Supervisor => day.supervisor_hours = hours,
            }
        }
    }

    for c in &dedup.clusters {
        if let Some(day) = days.get_mut(&c.entry_date) {
            day.duplicate_clusters += 1;
        }
    }
    for g in gaps {
        if let Some(day) = days.get_mut(&g.date) {
            day.missing.push(g.source_kind);
        }
    }

    days.into_values().collect()
}
