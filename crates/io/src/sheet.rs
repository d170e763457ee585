// Raw sheet loading (xlsx, xlsm, xls, xlsb, ods, csv)
//
// Loads every sheet of a source document into a plain cell grid. No layout
// interpretation happens here; adapters decide what the cells mean.

use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use sitediary_core::date::from_excel_serial;

use crate::error::AdapterError;

/// Hard cap on rows read per sheet. Diaries are a few hundred rows; anything
/// past this is a runaway used-range.
const MAX_ROWS: usize = 20_000;

/// Hard cap on columns read per sheet.
const MAX_COLS: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    /// Excel serial (1900 system), as calamine reports date-formatted cells.
    Date(f64),
    Bool(bool),
}

impl RawCell {
    pub fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Canonical text rendering. Dates render as ISO so a re-saved workbook
    /// with a different date display format still renders the same.
    pub fn render(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Number(n) => format_number(*n),
            RawCell::Date(serial) => match from_excel_serial(*serial) {
                Ok(d) => d.to_string(),
                Err(_) => format_number(*serial),
            },
            RawCell::Bool(b) => if *b { "TRUE".into() } else { "FALSE".into() },
        }
    }
}

fn format_number(n: f64) -> String {
    // Integers without decimals
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One sheet of one source document, rows addressed from the sheet's A1.
#[derive(Debug, Clone)]
pub struct RawSheet {
    /// `<relative path>::<sheet name>`
    pub document: String,
    pub name: String,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawSheet {
    pub fn new(document: impl Into<String>, name: impl Into<String>, rows: Vec<Vec<RawCell>>) -> Self {
        Self { document: document.into(), name: name.into(), rows }
    }

    /// Build from string cells. Handy for CSV and tests.
    pub fn from_text_rows(document: impl Into<String>, name: impl Into<String>, rows: &[Vec<&str>]) -> Self {
        let rows = rows
            .iter()
            .map(|r| {
                r.iter()
                    .map(|s| if s.is_empty() { RawCell::Empty } else { RawCell::Text(s.to_string()) })
                    .collect()
            })
            .collect();
        Self::new(document, name, rows)
    }

    pub fn cell(&self, row: usize, col: usize) -> &RawCell {
        static EMPTY: RawCell = RawCell::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    pub fn rendered_row(&self, row: usize) -> Vec<String> {
        self.rows
            .get(row)
            .map(|r| r.iter().map(RawCell::render).collect())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Workbooks
// ---------------------------------------------------------------------------

/// Load all sheets of a workbook. Sheets that fail to read individually are
/// returned as `Err` entries so the caller can warn and keep going.
pub fn load_workbook(
    path: &Path,
    document_prefix: &str,
) -> Result<Vec<Result<RawSheet, AdapterError>>, AdapterError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| AdapterError::Open {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for sheet_name in &sheet_names {
        let document = format!("{document_prefix}::{sheet_name}");
        let range = match workbook.worksheet_range(sheet_name) {
            Ok(range) => range,
            Err(e) => {
                sheets.push(Err(AdapterError::Read { document, message: e.to_string() }));
                continue;
            }
        };

        // Range start offset (data may not begin at A1)
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let start_row = start_row as usize;
        let start_col = start_col as usize;

        let mut rows: Vec<Vec<RawCell>> = vec![Vec::new(); start_row.min(MAX_ROWS)];
        for row in range.rows() {
            if rows.len() >= MAX_ROWS {
                log::warn!("{document}: truncated at {MAX_ROWS} rows");
                break;
            }
            let mut cells = vec![RawCell::Empty; start_col.min(MAX_COLS)];
            for cell in row.iter() {
                if cells.len() >= MAX_COLS {
                    break;
                }
                cells.push(convert_cell(cell));
            }
            while matches!(cells.last(), Some(RawCell::Empty)) {
                cells.pop();
            }
            rows.push(cells);
        }

        sheets.push(Ok(RawSheet::new(document, sheet_name.clone(), rows)));
    }

    Ok(sheets)
}

fn convert_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                RawCell::Empty
            } else {
                RawCell::Text(s.clone())
            }
        }
        Data::Float(n) => RawCell::Number(*n),
        Data::Int(n) => RawCell::Number(*n as f64),
        Data::Bool(b) => RawCell::Bool(*b),
        // Error cells carry no diary content
        Data::Error(_) => RawCell::Empty,
        Data::DateTime(dt) => RawCell::Date(dt.as_f64()),
        Data::DateTimeIso(s) => RawCell::Text(s.clone()),
        Data::DurationIso(s) => RawCell::Text(s.clone()),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Load a CSV/TSV export as a single sheet named after the file stem.
pub fn load_csv(path: &Path, document_prefix: &str) -> Result<RawSheet, AdapterError> {
    let content = read_file_as_utf8(path).map_err(|message| AdapterError::Open {
        path: path.display().to_string(),
        message,
    })?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "csv".into());
    let document = format!("{document_prefix}::{name}");
    let rows = parse_csv(&content, sniff_delimiter(&content)).map_err(|message| AdapterError::Read {
        document: document.clone(),
        message,
    })?;
    Ok(RawSheet::new(document, name, rows))
}

fn parse_csv(content: &str, delimiter: u8) -> Result<Vec<Vec<RawCell>>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        let mut cells: Vec<RawCell> = record
            .iter()
            .take(MAX_COLS)
            .map(|field| {
                if field.trim().is_empty() {
                    RawCell::Empty
                } else {
                    RawCell::Text(field.to_string())
                }
            })
            .collect();
        while matches!(cells.last(), Some(RawCell::Empty)) {
            cells.pop();
        }
        rows.push(cells);
        if rows.len() >= MAX_ROWS {
            break;
        }
    }
    Ok(rows)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.iter().copied().max().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        // Diaries have ragged preambles, so score by the dominant multi-field width
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.trim_start_matches('\u{feff}').to_string()),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}
