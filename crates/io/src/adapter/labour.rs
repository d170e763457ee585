//! Supervisor shift-report labour section.
//!
//! The report date sits in the preamble. The labour table header has `Hours`
//! immediately followed by `Machine`; the worker's name is the column left of
//! `Hours`. The section runs until one of the report's later section titles.
//!
//! Free-text supervisor notes between the `DAILY WORK EXTENSION` and
//! `DAILY WORK PHOTOS` titles follow the labour rows as person-less entries.

use std::ops::Range;

use chrono::NaiveDate;
use sitediary_core::hash::row_hash;
use sitediary_core::normalize::{normalize_person, normalize_text};
use sitediary_core::{EntryCandidate, SourceKind};

use super::{
    cell_minutes, header_label, is_blank_row, is_footer_row, preamble_date, reject, AdapterOptions,
    RowOutcome, RowStream, SheetAdapter,
};
use crate::error::AdapterError;
use crate::sheet::RawSheet;

const STOP_MARKERS: &[&str] = &[
    "PLANT NOT",
    "PLANNED WORKS",
    "INCIDENTS",
    "COMMUNICATIONS",
    "DAILY WORK EXTENSION",
    "DAILY WORK PHOTOS",
];

#[derive(Debug, Clone, Copy)]
struct LabourColumns {
    header_row: usize,
    person: usize,
    hours: usize,
    activity: Option<usize>,
    comments: Option<usize>,
}

fn locate(sheet: &RawSheet, scan_rows: usize) -> Option<LabourColumns> {
    for (row, cells) in sheet.rows.iter().enumerate().take(scan_rows) {
        let labels: Vec<String> = cells.iter().map(header_label).collect();
        let hours = labels
            .windows(2)
            .position(|pair| pair[0] == "hours" && pair[1] == "machine");
        let Some(hours) = hours else { continue };
        if hours == 0 {
            continue;
        }
        let find = |name: &str| labels.iter().position(|l| l == name);
        let comments = find("comments").or_else(|| find("comment"));
        let activity = find("activity");
        if comments.is_none() && activity.is_none() {
            continue;
        }
        return Some(LabourColumns { header_row: row, person: hours - 1, hours, activity, comments });
    }
    None
}

fn is_section_end(sheet: &RawSheet, row: usize) -> bool {
    let Some(first) = sheet.rows.get(row).and_then(|cells| cells.iter().find(|c| !c.is_empty())) else {
        return false;
    };
    let label = first.render().to_uppercase();
    STOP_MARKERS.iter().any(|m| label.contains(m))
}

pub struct LabourSheetAdapter;

impl SheetAdapter for LabourSheetAdapter {
    fn name(&self) -> &'static str {
        "labour-sheet"
    }

    fn accepts(&self, sheet: &RawSheet, kind: SourceKind, options: &AdapterOptions) -> bool {
        kind == SourceKind::Supervisor && locate(sheet, options.header_scan_rows).is_some()
    }

    fn extract<'a>(
        &self,
        sheet: &'a RawSheet,
        kind: SourceKind,
        options: &'a AdapterOptions,
    ) -> Result<RowStream<'a>, AdapterError> {
        let cols = locate(sheet, options.header_scan_rows).ok_or_else(|| AdapterError::SchemaDetection {
            sheet: sheet.document.clone(),
            scanned: options.header_scan_rows.min(sheet.rows.len()),
        })?;
        let date = preamble_date(sheet, cols.header_row)
            .ok_or_else(|| AdapterError::MissingSheetDate { sheet: sheet.document.clone() })?;

        let stream = (cols.header_row + 1..sheet.rows.len())
            .take_while(move |&row| !is_section_end(sheet, row))
            .filter_map(move |row| labour_row(sheet, kind, options, cols, date, row));
        let notes = extension_rows(sheet).filter_map(move |row| extension_note(sheet, kind, date, row));
        Ok(Box::new(stream.chain(notes)))
    }
}

/// Rows strictly between the extension title and the photos title; empty when
/// either is missing.
fn extension_rows(sheet: &RawSheet) -> Range<usize> {
    let titled = |row: usize, marker: &str| {
        sheet
            .rendered_row(row)
            .iter()
            .any(|c| c.to_uppercase().contains(marker))
    };
    let Some(start) = (0..sheet.rows.len()).find(|&r| titled(r, "DAILY WORK EXTENSION")) else {
        return 0..0;
    };
    match (start + 1..sheet.rows.len()).find(|&r| titled(r, "DAILY WORK PHOTOS")) {
        Some(end) => start + 1..end,
        None => 0..0,
    }
}

fn extension_note(sheet: &RawSheet, kind: SourceKind, date: NaiveDate, row: usize) -> Option<RowOutcome> {
    let cells: Vec<String> = sheet
        .rendered_row(row)
        .iter()
        .map(|c| normalize_text(c))
        .filter(|c| !c.is_empty())
        .collect();
    if cells.is_empty() {
        return None;
    }

    let iso = date.to_string();
    Some(RowOutcome::Entry(EntryCandidate {
        source_kind: kind,
        source_document: sheet.document.clone(),
        row_index: (row + 1) as u32,
        entry_date: date,
        person: String::new(),
        activity_text: format!("Extension: {}", cells.join(" | ")),
        duration_minutes: 0,
        raw_row_hash: row_hash(&sheet.rendered_row(row), &[("sheet_date", &iso), ("part", "extension")]),
    }))
}

fn labour_row(
    sheet: &RawSheet,
    kind: SourceKind,
    options: &AdapterOptions,
    cols: LabourColumns,
    date: NaiveDate,
    row: usize,
) -> Option<RowOutcome> {
    if is_blank_row(sheet, row) || is_footer_row(sheet, row) {
        return None;
    }

    let text_at = |col: Option<usize>| {
        col.map(|c| normalize_text(&sheet.cell(row, c).render()))
            .unwrap_or_default()
    };
    let activity = text_at(cols.activity);
    let comment = text_at(cols.comments);
    let activity_text = match (activity.is_empty(), comment.is_empty()) {
        // Plant/equipment rows without any narrative
        (true, true) => return None,
        (false, true) => activity,
        (true, false) => comment,
        (false, false) if activity.eq_ignore_ascii_case(&comment) => comment,
        (false, false) => format!("{activity}: {comment}"),
    };

    let raw_person = sheet.cell(row, cols.person).render();
    if raw_person.is_empty() {
        return Some(reject(sheet, row, "missing person"));
    }
    let person = normalize_person(&raw_person, &options.aliases);

    let duration_minutes = match cell_minutes(sheet.cell(row, cols.hours)) {
        Ok(m) => m,
        Err(e) => return Some(reject(sheet, row, e.to_string())),
    };

    let iso = date.to_string();
    Some(RowOutcome::Entry(EntryCandidate {
        source_kind: kind,
        source_document: sheet.document.clone(),
        row_index: (row + 1) as u32,
        entry_date: date,
        person,
        activity_text,
        duration_minutes,
        raw_row_hash: row_hash(&sheet.rendered_row(row), &[("sheet_date", &iso)]),
    }))
}
