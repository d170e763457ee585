//! CSV / JSON write-out for the derived datasets.
//!
//! Rows are flattened into string-friendly records here; list-valued fields
//! are joined with "; ".

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sitediary_core::DiaryEntry;
use sitediary_recon::{ActivityRollup, DailySummary, MemberRow, NameVariantRollup};

use crate::CliError;

#[derive(Serialize)]
pub struct DuplicateRow<'a> {
    cluster_id: &'a str,
    match_basis: String,
    confidence: String,
    cross_source: bool,
    entry_id: i64,
    source_kind: &'static str,
    diary_date: String,
    person: &'a str,
    activity_text: &'a str,
    hours: String,
    source_document: &'a str,
    row_index: u32,
}

impl<'a> From<&'a MemberRow> for DuplicateRow<'a> {
    fn from(r: &'a MemberRow) -> Self {
        Self {
            cluster_id: &r.cluster_id,
            match_basis: r.match_basis.to_string(),
            confidence: format!("{:.4}", r.confidence),
            cross_source: r.cross_source,
            entry_id: r.entry_id,
            source_kind: r.source_kind.as_str(),
            diary_date: r.entry_date.to_string(),
            person: &r.person,
            activity_text: &r.activity_text,
            hours: format_hours(r.hours),
            source_document: &r.source_document,
            row_index: r.row_index,
        }
    }
}

#[derive(Serialize)]
pub struct ActivityRow<'a> {
    diary_date: String,
    activity_text: &'a str,
    sources_present: String,
    sources_missing: String,
    status: &'a str,
    unique_to_source: bool,
    report_copies_for_date: usize,
}

impl<'a> From<&'a ActivityRollup> for ActivityRow<'a> {
    fn from(a: &'a ActivityRollup) -> Self {
        Self {
            diary_date: a.entry_date.to_string(),
            activity_text: &a.activity_text,
            sources_present: a.sources_present.join("; "),
            sources_missing: a.sources_missing.join("; "),
            status: &a.status,
            unique_to_source: a.unique_to_source,
            report_copies_for_date: a.copies_for_date,
        }
    }
}

#[derive(Serialize)]
pub struct PersonnelRow<'a> {
    canonical: &'a str,
    variant: &'a str,
    entries: usize,
    source_kinds: String,
    family_entries: usize,
}

/// One row per variant in each family.
pub fn personnel_rows(families: &[NameVariantRollup]) -> Vec<PersonnelRow<'_>> {
    families
        .iter()
        .flat_map(|f| {
            f.variants.iter().map(move |v| PersonnelRow {
                canonical: &f.canonical,
                variant: &v.person,
                entries: v.entries,
                source_kinds: v.kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>().join("; "),
                family_entries: f.total_entries,
            })
        })
        .collect()
}

#[derive(Serialize)]
pub struct DailyRow {
    date: String,
    client_entries: usize,
    client_hours: String,
    supervisor_entries: usize,
    supervisor_hours: String,
    duplicate_clusters: usize,
    missing_sources: String,
}

impl From<&DailySummary> for DailyRow {
    fn from(d: &DailySummary) -> Self {
        Self {
            date: d.date.to_string(),
            client_entries: d.client_entries,
            client_hours: format_hours(d.client_hours),
            supervisor_entries: d.supervisor_entries,
            supervisor_hours: format_hours(d.supervisor_hours),
            duplicate_clusters: d.duplicate_clusters,
            missing_sources: d.missing.iter().map(|k| k.as_str()).collect::<Vec<_>>().join("; "),
        }
    }
}

#[derive(Serialize)]
pub struct EntryRow<'a> {
    entry_id: i64,
    diary_date: String,
    person: &'a str,
    activity_text: &'a str,
    hours: String,
    source_document: &'a str,
    row_index: u32,
    audit_status: &'static str,
    audit_notes: &'a str,
}

impl<'a> From<&'a DiaryEntry> for EntryRow<'a> {
    fn from(e: &'a DiaryEntry) -> Self {
        Self {
            entry_id: e.entry_id,
            diary_date: e.entry_date.to_string(),
            person: &e.person,
            activity_text: &e.activity_text,
            hours: format_hours(e.hours()),
            source_document: &e.source_document,
            row_index: e.row_index,
            audit_status: e.audit_status.map(|s| s.as_str()).unwrap_or(""),
            audit_notes: e.audit_notes.as_deref().unwrap_or(""),
        }
    }
}

fn format_hours(h: f64) -> String {
    format!("{h:.2}")
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

pub fn ensure_out_dir(out: &Path) -> Result<(), CliError> {
    fs::create_dir_all(out)
        .map_err(|e| CliError::usage(format!("cannot create output directory {}: {e}", out.display())))
}

/// Write `rows` with a header line. An empty set still gets its header.
pub fn write_csv<T: Serialize>(
    out: &Path,
    name: &str,
    headers: &[&str],
    rows: impl IntoIterator<Item = T>,
) -> Result<PathBuf, CliError> {
    let path = out.join(name);
    let fail = |e: csv::Error| CliError::io(format!("cannot write {}: {e}", path.display()));

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .map_err(fail)?;
    writer.write_record(headers).map_err(fail)?;
    for row in rows {
        writer.serialize(row).map_err(fail)?;
    }
    writer
        .flush()
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
    tracing::info!("wrote {}", path.display());
    Ok(path)
}

pub fn write_json<T: Serialize>(out: &Path, name: &str, value: &T) -> Result<PathBuf, CliError> {
    let path = out.join(name);
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("cannot serialize {name}: {e}")))?;
    fs::write(&path, json + "\n").map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
    tracing::info!("wrote {}", path.display());
    Ok(path)
}

pub const DUPLICATE_HEADERS: &[&str] = &[
    "cluster_id",
    "match_basis",
    "confidence",
    "cross_source",
    "entry_id",
    "source_kind",
    "diary_date",
    "person",
    "activity_text",
    "hours",
    "source_document",
    "row_index",
];

pub const ACTIVITY_HEADERS: &[&str] = &[
    "diary_date",
    "activity_text",
    "sources_present",
    "sources_missing",
    "status",
    "unique_to_source",
    "report_copies_for_date",
];

pub const PERSONNEL_HEADERS: &[&str] = &["canonical", "variant", "entries", "source_kinds", "family_entries"];

pub const DAILY_HEADERS: &[&str] = &[
    "date",
    "client_entries",
    "client_hours",
    "supervisor_entries",
    "supervisor_hours",
    "duplicate_clusters",
    "missing_sources",
];

pub const ENTRY_HEADERS: &[&str] = &[
    "entry_id",
    "diary_date",
    "person",
    "activity_text",
    "hours",
    "source_document",
    "row_index",
    "audit_status",
    "audit_notes",
];
