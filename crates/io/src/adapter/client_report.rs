//! Client daily report: titled sections instead of one table.
//!
//! The report date is the first date anywhere on the sheet. Each section opens
//! with an upper-case title in the row's first non-empty cell and closes at its
//! own end title:
//!
//! | title                | ends at          | one entry per                  |
//! |----------------------|------------------|--------------------------------|
//! | `PRODUCTION`         | `PHOTOS`         | activity row                   |
//! | `PERSONNEL`          | `PLANT`          | named person per crew column   |
//! | `DELAYS-OPPORTUNITY` | `HSEQ`           | line of text                   |
//! | `INCIDENTS`          | `COMMUNICATIONS` | incident with a count or note  |
//!
//! The personnel grid starts with a row of crew labels. Each label marks a
//! `name | position | hours` column triple; labels closer than three columns
//! to the previous one belong to the same crew.

use chrono::NaiveDate;
use sitediary_core::hash::row_hash;
use sitediary_core::normalize::{normalize_person, normalize_text};
use sitediary_core::{EntryCandidate, SourceKind};

use super::{
    cell_minutes, header_label, is_blank_row, preamble_date, reject, AdapterOptions, RowOutcome,
    RowStream, SheetAdapter,
};
use crate::error::AdapterError;
use crate::sheet::{RawCell, RawSheet};

const CREW_SPAN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Production,
    Personnel,
    Delays,
    Incidents,
}

impl Section {
    const ALL: [Section; 4] = [Section::Production, Section::Personnel, Section::Delays, Section::Incidents];

    fn title(self) -> &'static str {
        match self {
            Section::Production => "PRODUCTION",
            Section::Personnel => "PERSONNEL",
            Section::Delays => "DELAYS-OPPORTUNITY",
            Section::Incidents => "INCIDENTS",
        }
    }

    fn end_title(self) -> &'static str {
        match self {
            Section::Production => "PHOTOS",
            Section::Personnel => "PLANT",
            Section::Delays => "HSEQ",
            Section::Incidents => "COMMUNICATIONS",
        }
    }

    fn titled(label: &str) -> Option<Section> {
        Section::ALL.into_iter().find(|s| label.contains(s.title()))
    }
}

#[derive(Debug, Clone)]
struct Crew {
    col: usize,
    label: String,
}

/// Content rows by section, in sheet order.
#[derive(Debug, Default)]
struct ReportLayout {
    rows: Vec<(usize, Section)>,
    crews: Vec<Crew>,
}

/// Upper-case first non-empty cell, when the row reads as a section title.
fn title_label(sheet: &RawSheet, row: usize) -> Option<String> {
    let first = sheet.rows.get(row)?.iter().find(|c| !c.is_empty())?.render();
    let is_title = first.chars().any(char::is_alphabetic) && !first.chars().any(char::is_lowercase);
    is_title.then_some(first)
}

fn row_contains(sheet: &RawSheet, row: usize, needle: &str) -> bool {
    sheet
        .rows
        .get(row)
        .map(|cells| cells.iter().any(|c| c.render().to_uppercase().contains(needle)))
        .unwrap_or(false)
}

fn crew_columns(sheet: &RawSheet, row: usize) -> Vec<Crew> {
    let mut crews: Vec<Crew> = Vec::new();
    for (col, cell) in sheet.rows[row].iter().enumerate() {
        let label = normalize_text(&cell.render());
        if label.is_empty() {
            continue;
        }
        if crews.last().map_or(true, |prev| col - prev.col >= CREW_SPAN) {
            crews.push(Crew { col, label });
        }
    }
    crews
}

fn is_crew_header(sheet: &RawSheet, row: usize) -> bool {
    let labels: Vec<String> = sheet.rows[row].iter().map(header_label).collect();
    labels.iter().any(|l| l == "name") && labels.iter().any(|l| l == "position")
}

fn is_total_row(sheet: &RawSheet, row: usize) -> bool {
    sheet.rows[row]
        .iter()
        .any(|c| c.render().to_lowercase().starts_with("total"))
}

fn layout(sheet: &RawSheet) -> ReportLayout {
    let mut out = ReportLayout::default();
    let mut current: Option<Section> = None;
    let mut personnel_seen = false;
    let mut crew_header_seen = false;
    let mut incident_header_seen = false;

    for row in 0..sheet.rows.len() {
        if is_blank_row(sheet, row) {
            continue;
        }
        if let Some(label) = title_label(sheet, row) {
            if current.is_some_and(|s| label.contains(s.end_title())) {
                current = None;
                continue;
            }
            if let Some(next) = Section::titled(&label) {
                current = Some(next);
                if next == Section::Personnel {
                    if personnel_seen {
                        log::debug!("{}: second personnel grid at row {} ignored", sheet.document, row + 1);
                        current = None;
                    }
                    personnel_seen = true;
                }
                continue;
            }
        }

        match current {
            None => {}
            Some(Section::Production) => {
                if !row_contains(sheet, row, "COMMUNICATIONS") {
                    out.rows.push((row, Section::Production));
                }
            }
            Some(Section::Personnel) => {
                if out.crews.is_empty() {
                    out.crews = crew_columns(sheet, row);
                } else if !crew_header_seen && is_crew_header(sheet, row) {
                    crew_header_seen = true;
                } else if !is_total_row(sheet, row) {
                    out.rows.push((row, Section::Personnel));
                }
            }
            Some(Section::Delays) => out.rows.push((row, Section::Delays)),
            Some(Section::Incidents) => {
                if !incident_header_seen && (row_contains(sheet, row, "QTY") || row_contains(sheet, row, "COMMENTS")) {
                    incident_header_seen = true;
                } else {
                    out.rows.push((row, Section::Incidents));
                }
            }
        }
    }
    out
}

pub struct ClientReportAdapter;

impl SheetAdapter for ClientReportAdapter {
    fn name(&self) -> &'static str {
        "client-report"
    }

    fn accepts(&self, sheet: &RawSheet, kind: SourceKind, _options: &AdapterOptions) -> bool {
        kind == SourceKind::Client
            && (0..sheet.rows.len()).any(|row| {
                title_label(sheet, row)
                    .and_then(|label| Section::titled(&label))
                    .is_some_and(|s| matches!(s, Section::Production | Section::Personnel))
            })
    }

    fn extract<'a>(
        &self,
        sheet: &'a RawSheet,
        kind: SourceKind,
        options: &'a AdapterOptions,
    ) -> Result<RowStream<'a>, AdapterError> {
        let date = preamble_date(sheet, sheet.rows.len())
            .ok_or_else(|| AdapterError::MissingSheetDate { sheet: sheet.document.clone() })?;
        let ReportLayout { rows, crews } = layout(sheet);

        let report = Report { sheet, kind, options, date, crews };
        let stream = rows
            .into_iter()
            .flat_map(move |(row, section)| report.section_row(row, section));
        Ok(Box::new(stream))
    }
}

struct Report<'a> {
    sheet: &'a RawSheet,
    kind: SourceKind,
    options: &'a AdapterOptions,
    date: NaiveDate,
    crews: Vec<Crew>,
}

impl Report<'_> {
    fn section_row(&self, row: usize, section: Section) -> Vec<RowOutcome> {
        match section {
            Section::Production => self.activity(row).into_iter().collect(),
            Section::Personnel => self.crew_members(row),
            Section::Delays => self.delays(row),
            Section::Incidents => self.incident(row).into_iter().collect(),
        }
    }

    fn entry(&self, row: usize, person: String, activity_text: String, duration_minutes: i64, part: &str) -> RowOutcome {
        let iso = self.date.to_string();
        RowOutcome::Entry(EntryCandidate {
            source_kind: self.kind,
            source_document: self.sheet.document.clone(),
            row_index: (row + 1) as u32,
            entry_date: self.date,
            person,
            activity_text,
            duration_minutes,
            raw_row_hash: row_hash(&self.sheet.rendered_row(row), &[("sheet_date", &iso), ("part", part)]),
        })
    }

    fn activity(&self, row: usize) -> Option<RowOutcome> {
        let cells: Vec<String> = self
            .sheet
            .rendered_row(row)
            .iter()
            .map(|c| normalize_text(c))
            .filter(|c| !c.is_empty())
            .collect();
        if cells.is_empty() {
            return None;
        }
        Some(self.entry(row, String::new(), cells.join(" | "), 0, "production"))
    }

    fn crew_members(&self, row: usize) -> Vec<RowOutcome> {
        let mut out = Vec::new();
        for crew in &self.crews {
            let name = self.sheet.cell(row, crew.col).render();
            if !is_person_name(&name) {
                continue;
            }
            let minutes = match cell_minutes(self.sheet.cell(row, crew.col + 2)) {
                Ok(m) => m,
                Err(e) => {
                    out.push(reject(self.sheet, row, format!("{}: {e}", crew.label)));
                    continue;
                }
            };
            let position = normalize_text(&self.sheet.cell(row, crew.col + 1).render());
            let activity_text = if position.is_empty() {
                crew.label.clone()
            } else {
                format!("{}: {position}", crew.label)
            };
            let person = normalize_person(&name, &self.options.aliases);
            let part = format!("personnel:{}", crew.col);
            out.push(self.entry(row, person, activity_text, minutes, &part));
        }
        out
    }

    fn delays(&self, row: usize) -> Vec<RowOutcome> {
        let joined = self
            .sheet
            .rendered_row(row)
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        joined
            .lines()
            .map(normalize_text)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| self.entry(row, String::new(), format!("Delay: {line}"), 0, &format!("delay:{i}")))
            .collect()
    }

    fn incident(&self, row: usize) -> Option<RowOutcome> {
        let label = normalize_text(&self.sheet.cell(row, 0).render());
        if label.is_empty() {
            return None;
        }
        let qty = incident_count(self.sheet.cell(row, 1));
        let mut comments = normalize_text(&self.sheet.cell(row, 2).render());
        if comments.eq_ignore_ascii_case("na") || comments.eq_ignore_ascii_case("n/a") {
            comments.clear();
        }
        if qty == 0.0 && comments.is_empty() {
            return None;
        }

        let mut text = format!("Incident: {label}");
        if qty > 0.0 {
            text.push_str(&format!(" (qty {qty})"));
        }
        if !comments.is_empty() {
            text.push_str(&format!(" - {comments}"));
        }
        Some(self.entry(row, String::new(), text, 0, "incident"))
    }
}

/// Crew cells also hold headings, phone numbers and counts.
fn is_person_name(value: &str) -> bool {
    let text = value.trim();
    if text.is_empty() || text.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    !matches!(text.to_lowercase().as_str(), "name" | "contact")
}

fn incident_count(cell: &RawCell) -> f64 {
    match cell {
        RawCell::Number(n) => *n,
        RawCell::Text(s) => s.trim().replace(',', "").parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::extract_sheet;

    fn client_report() -> RawSheet {
        RawSheet::from_text_rows(
            "client/CDR 03-10.xlsx::Report",
            "Report",
            &[
                vec!["", "Client Daily Report"],
                vec!["", "Date:", "03/10/2025"],
                vec![""],
                vec!["PERSONNEL"],
                vec!["Civil crew", "", "", "Survey"],
                vec!["Name", "Position", "Hours", "Name", "Position", "Hours"],
                vec!["John Doe", "Foreman", "10", "Jane Roe", "Surveyor", "8"],
                vec!["Worker One", "Labourer", "ten", "", "", ""],
                vec!["Total", "", "18", "", "", "8"],
                vec!["PLANT"],
                vec!["EX01", "Excavator", "8"],
                vec!["DELAYS-OPPORTUNITY"],
                vec!["Rain stopped works 10am\nAccess gate locked"],
                vec!["HSEQ"],
                vec!["INCIDENTS"],
                vec!["Type", "Qty", "Comments"],
                vec!["Near miss", "1", "Reversing truck"],
                vec!["First aid", "0", "N/A"],
                vec!["Environmental", "0", "Minor spill cleaned up"],
                vec!["COMMUNICATIONS"],
                vec!["PRODUCTION"],
                vec!["Trenching Ch 100-140", "40m"],
                vec!["COMMUNICATIONS", "Toolbox talk"],
                vec!["Pipe laying DN300"],
                vec!["DAILY WORK PHOTOS"],
                vec!["Trenching photo"],
            ],
        )
    }

    #[test]
    fn sections_become_entries() {
        let opts = AdapterOptions::default();
        let ext = extract_sheet(&client_report(), SourceKind::Client, &opts).unwrap();
        assert_eq!(ext.adapter, "client-report");

        let got: Vec<(u32, &str, &str, i64)> = ext
            .candidates
            .iter()
            .map(|c| (c.row_index, c.person.as_str(), c.activity_text.as_str(), c.duration_minutes))
            .collect();
        assert_eq!(
            got,
            vec![
                (7, "john doe", "Civil crew: Foreman", 600),
                (7, "jane roe", "Survey: Surveyor", 480),
                (13, "", "Delay: Rain stopped works 10am", 0),
                (13, "", "Delay: Access gate locked", 0),
                (17, "", "Incident: Near miss (qty 1) - Reversing truck", 0),
                (19, "", "Incident: Environmental - Minor spill cleaned up", 0),
                (22, "", "Trenching Ch 100-140 | 40m", 0),
                (24, "", "Pipe laying DN300", 0),
            ]
        );
        let date = NaiveDate::from_ymd_opt(2025, 10, 3).unwrap();
        assert!(ext.candidates.iter().all(|c| c.entry_date == date));

        assert_eq!(ext.rejections.len(), 1);
        assert_eq!(ext.rejections[0].row_index, 8);
        assert!(ext.rejections[0].reason.starts_with("Civil crew: "));
    }

    #[test]
    fn entries_sharing_a_row_hash_differently() {
        let opts = AdapterOptions::default();
        let ext = extract_sheet(&client_report(), SourceKind::Client, &opts).unwrap();
        let mut hashes: Vec<&str> = ext.candidates.iter().map(|c| c.raw_row_hash.as_str()).collect();
        hashes.sort_unstable();
        hashes.dedup();
        assert_eq!(hashes.len(), ext.candidates.len());
    }

    #[test]
    fn only_accepts_client_sheets_with_section_titles() {
        let opts = AdapterOptions::default();
        assert!(ClientReportAdapter.accepts(&client_report(), SourceKind::Client, &opts));
        assert!(!ClientReportAdapter.accepts(&client_report(), SourceKind::Supervisor, &opts));

        // Lower-case text mentioning a title is an activity, not a section
        let table = RawSheet::from_text_rows(
            "c::s",
            "s",
            &[
                vec!["Date", "Name", "Activity", "Hours"],
                vec!["01/02/2025", "John Doe", "Production meeting", "1"],
            ],
        );
        assert!(!ClientReportAdapter.accepts(&table, SourceKind::Client, &opts));
        let ext = extract_sheet(&table, SourceKind::Client, &opts).unwrap();
        assert_eq!(ext.adapter, "header-table");
    }

    #[test]
    fn report_without_a_date() {
        let sheet = RawSheet::from_text_rows("c::s", "s", &[vec!["PRODUCTION"], vec!["Pour slab"]]);
        let err = extract_sheet(&sheet, SourceKind::Client, &AdapterOptions::default()).unwrap_err();
        assert!(matches!(err, AdapterError::MissingSheetDate { .. }));
    }

    #[test]
    fn crew_labels_closer_than_a_triple_collapse() {
        let sheet = RawSheet::from_text_rows("c::s", "s", &[vec!["Civil", "crew", "", "", "Survey"]]);
        let crews: Vec<(usize, String)> = crew_columns(&sheet, 0).into_iter().map(|c| (c.col, c.label)).collect();
        assert_eq!(crews, vec![(0, "Civil".to_string()), (4, "Survey".to_string())]);
    }
}
