//! Layout adapters: raw sheet grid → entry candidates.
//!
//! Each spreadsheet layout family is one [`SheetAdapter`]. Selection is the
//! caller-declared [`SourceKind`] plus a cheap structural check; the first
//! adapter that accepts the sheet extracts it.

mod client_report;
mod header;
mod labour;

use chrono::NaiveDate;
use sitediary_core::date::{from_excel_serial, parse_date_text};
use sitediary_core::normalize::{minutes_from_hours, normalize_text, parse_duration_minutes, AliasTable};
use sitediary_core::{EntryCandidate, NormalizeError, RowRejection, SourceKind};

use crate::discover::DEFAULT_EXTENSIONS;
use crate::error::AdapterError;
use crate::sheet::{RawCell, RawSheet};

pub use client_report::ClientReportAdapter;
pub use header::HeaderTableAdapter;
pub use labour::LabourSheetAdapter;

/// Rows scanned for a header when nothing else is configured.
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 25;

#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// How far down a sheet to look for the header row.
    pub header_scan_rows: usize,
    pub aliases: AliasTable,
    /// File extensions picked up during discovery, without the dot.
    pub extensions: Vec<String>,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            header_scan_rows: DEFAULT_HEADER_SCAN_ROWS,
            aliases: AliasTable::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Entry(EntryCandidate),
    Rejected(RowRejection),
}

/// Lazy, finite, single-pass sequence of row outcomes for one sheet.
pub type RowStream<'a> = Box<dyn Iterator<Item = RowOutcome> + 'a>;

pub trait SheetAdapter: Sync {
    fn name(&self) -> &'static str;

    /// Cheap structural check; no row is normalized here.
    fn accepts(&self, sheet: &RawSheet, kind: SourceKind, options: &AdapterOptions) -> bool;

    fn extract<'a>(
        &self,
        sheet: &'a RawSheet,
        kind: SourceKind,
        options: &'a AdapterOptions,
    ) -> Result<RowStream<'a>, AdapterError>;
}

/// Order matters: the labour and client-report layouts can both contain rows
/// that read as a header, so they are tried before the generic table.
const ADAPTERS: &[&dyn SheetAdapter] = &[&LabourSheetAdapter, &ClientReportAdapter, &HeaderTableAdapter];

/// Everything one sheet produced.
#[derive(Debug, Clone, Default)]
pub struct SheetExtraction {
    pub adapter: &'static str,
    pub candidates: Vec<EntryCandidate>,
    pub rejections: Vec<RowRejection>,
}

/// Pick an adapter for `sheet` and drain its rows.
pub fn extract_sheet(
    sheet: &RawSheet,
    kind: SourceKind,
    options: &AdapterOptions,
) -> Result<SheetExtraction, AdapterError> {
    let adapter = ADAPTERS
        .iter()
        .find(|a| a.accepts(sheet, kind, options))
        .ok_or_else(|| AdapterError::SchemaDetection {
            sheet: sheet.document.clone(),
            scanned: options.header_scan_rows.min(sheet.rows.len()),
        })?;

    let mut extraction = SheetExtraction {
        adapter: adapter.name(),
        ..Default::default()
    };
    for outcome in adapter.extract(sheet, kind, options)? {
        match outcome {
            RowOutcome::Entry(c) => extraction.candidates.push(c),
            RowOutcome::Rejected(r) => {
                log::debug!("rejected {r}");
                extraction.rejections.push(r);
            }
        }
    }
    log::debug!(
        "{}: {} via {} ({} rejected)",
        sheet.document,
        extraction.candidates.len(),
        extraction.adapter,
        extraction.rejections.len()
    );
    Ok(extraction)
}

// ---------------------------------------------------------------------------
// Shared row helpers
// ---------------------------------------------------------------------------

pub(crate) fn is_blank_row(sheet: &RawSheet, row: usize) -> bool {
    sheet
        .rows
        .get(row)
        .map(|cells| cells.iter().all(RawCell::is_empty))
        .unwrap_or(true)
}

/// "Total", "TOTAL HOURS", "Totals:" as the first non-empty cell.
pub(crate) fn is_footer_row(sheet: &RawSheet, row: usize) -> bool {
    sheet
        .rows
        .get(row)
        .and_then(|cells| cells.iter().find(|c| !c.is_empty()))
        .map(|c| {
            let label = header_label(c);
            let first = label.split(' ').next().unwrap_or_default();
            first == "total" || first == "totals"
        })
        .unwrap_or(false)
}

/// Normalized header label: lower-case, punctuation stripped, spaces collapsed.
pub(crate) fn header_label(cell: &RawCell) -> String {
    let text: String = cell
        .render()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    normalize_text(&text)
}

pub(crate) fn cell_date(cell: &RawCell) -> Result<NaiveDate, NormalizeError> {
    match cell {
        RawCell::Date(serial) | RawCell::Number(serial) => from_excel_serial(*serial),
        RawCell::Text(s) => parse_date_text(s),
        RawCell::Empty => Err(NormalizeError::Date(String::new())),
        RawCell::Bool(b) => Err(NormalizeError::Date(b.to_string())),
    }
}

pub(crate) fn cell_minutes(cell: &RawCell) -> Result<i64, NormalizeError> {
    match cell {
        RawCell::Empty => Ok(0),
        RawCell::Number(hours) => minutes_from_hours(*hours),
        RawCell::Text(s) => parse_duration_minutes(s),
        // A time-formatted cell ("2:30") arrives as a fraction of a day
        RawCell::Date(fraction) if (0.0..1.0).contains(fraction) => {
            Ok((fraction * 24.0 * 60.0).round() as i64)
        }
        other => Err(NormalizeError::Duration(other.render())),
    }
}

/// First date-bearing cell above `before_row`: a date-typed cell or text that
/// parses as a date ("Date: 03/10/2025"). Plain numbers are not trusted.
pub(crate) fn preamble_date(sheet: &RawSheet, before_row: usize) -> Option<NaiveDate> {
    sheet.rows.iter().take(before_row).flatten().find_map(|cell| match cell {
        RawCell::Date(serial) if *serial >= 1.0 => from_excel_serial(*serial).ok(),
        RawCell::Text(s) if s.chars().any(|c| c.is_ascii_digit()) => parse_date_text(s).ok(),
        _ => None,
    })
}

pub(crate) fn reject(sheet: &RawSheet, row: usize, reason: impl Into<String>) -> RowOutcome {
    RowOutcome::Rejected(RowRejection {
        source_document: sheet.document.clone(),
        row_index: (row + 1) as u32,
        reason: reason.into(),
    })
}
