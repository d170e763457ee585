//! Generic header-table layout.
//!
//! A header row somewhere near the top of the sheet names the columns; every
//! row below it is one entry. Column names vary between authors, so each role
//! is matched against a synonym set.

use chrono::NaiveDate;
use sitediary_core::hash::row_hash;
use sitediary_core::normalize::{normalize_person, normalize_text};
use sitediary_core::{EntryCandidate, SourceKind};

use super::{
    cell_date, cell_minutes, header_label, is_blank_row, is_footer_row, preamble_date, reject,
    AdapterOptions, RowOutcome, RowStream, SheetAdapter,
};
use crate::error::AdapterError;
use crate::sheet::RawSheet;

const DATE_HEADERS: &[&str] = &["date", "diary date", "entry date", "work date", "day", "shift date"];

const ACTIVITY_HEADERS: &[&str] = &[
    "activity",
    "activities",
    "activity description",
    "description",
    "task",
    "work performed",
    "work description",
    "comments",
    "comment",
    "details",
];

const PERSON_HEADERS: &[&str] = &[
    "name",
    "person",
    "employee",
    "worker",
    "personnel",
    "staff",
    "operator",
    "worker or group",
    "supervisor",
];

const DURATION_HEADERS: &[&str] = &["hours", "hrs", "duration", "time", "hours worked", "time spent"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    header_row: usize,
    date: Option<usize>,
    person: Option<usize>,
    activity: usize,
    duration: Option<usize>,
}

/// First row within the scan window carrying an activity column plus at
/// least one other recognized column. Left-most match wins per role.
fn locate(sheet: &RawSheet, scan_rows: usize) -> Option<Columns> {
    for (row, cells) in sheet.rows.iter().enumerate().take(scan_rows) {
        let mut date = None;
        let mut person = None;
        let mut activity = None;
        let mut duration = None;

        for (col, cell) in cells.iter().enumerate() {
            let label = header_label(cell);
            if label.is_empty() {
                continue;
            }
            let label = label.as_str();
            if date.is_none() && DATE_HEADERS.contains(&label) {
                date = Some(col);
            } else if activity.is_none() && ACTIVITY_HEADERS.contains(&label) {
                activity = Some(col);
            } else if person.is_none() && PERSON_HEADERS.contains(&label) {
                person = Some(col);
            } else if duration.is_none() && DURATION_HEADERS.contains(&label) {
                duration = Some(col);
            }
        }

        let others = [date, person, duration].iter().filter(|c| c.is_some()).count();
        if let (Some(activity), true) = (activity, others > 0) {
            return Some(Columns { header_row: row, date, person, activity, duration });
        }
    }
    None
}

pub struct HeaderTableAdapter;

impl SheetAdapter for HeaderTableAdapter {
    fn name(&self) -> &'static str {
        "header-table"
    }

    fn accepts(&self, sheet: &RawSheet, _kind: SourceKind, options: &AdapterOptions) -> bool {
        locate(sheet, options.header_scan_rows).is_some()
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

        let sheet_date = match cols.date {
            Some(_) => None,
            None => Some(
                preamble_date(sheet, cols.header_row)
                    .ok_or_else(|| AdapterError::MissingSheetDate { sheet: sheet.document.clone() })?,
            ),
        };

        let mut rows = TableRows {
            sheet,
            kind,
            options,
            cols,
            sheet_date,
            last_date: None,
            last_person: None,
        };
        let stream = (cols.header_row + 1..sheet.rows.len()).filter_map(move |row| rows.next_row(row));
        Ok(Box::new(stream))
    }
}

/// Fill-down state carried from one data row to the next.
struct TableRows<'a> {
    sheet: &'a RawSheet,
    kind: SourceKind,
    options: &'a AdapterOptions,
    cols: Columns,
    sheet_date: Option<NaiveDate>,
    last_date: Option<NaiveDate>,
    last_person: Option<String>,
}

impl TableRows<'_> {
    fn next_row(&mut self, row: usize) -> Option<RowOutcome> {
        let sheet = self.sheet;
        if is_blank_row(sheet, row) || is_footer_row(sheet, row) {
            return None;
        }

        let mut context: Vec<(&'static str, String)> = Vec::new();

        let entry_date = match (self.cols.date, self.sheet_date) {
            (Some(col), _) => {
                let cell = sheet.cell(row, col);
                if cell.is_empty() {
                    match self.last_date {
                        Some(d) => {
                            context.push(("filled_date", d.to_string()));
                            d
                        }
                        None => return Some(reject(sheet, row, "missing date")),
                    }
                } else {
                    match cell_date(cell) {
                        Ok(d) => {
                            self.last_date = Some(d);
                            d
                        }
                        Err(e) => {
                            self.last_date = None;
                            return Some(reject(sheet, row, e.to_string()));
                        }
                    }
                }
            }
            (None, Some(d)) => {
                context.push(("sheet_date", d.to_string()));
                d
            }
            (None, None) => return Some(reject(sheet, row, "missing date")),
        };

        let person = match self.cols.person {
            Some(col) => {
                let raw = sheet.cell(row, col).render();
                if raw.is_empty() {
                    match &self.last_person {
                        Some(p) => {
                            context.push(("filled_person", p.clone()));
                            p.clone()
                        }
                        None => return Some(reject(sheet, row, "missing person")),
                    }
                } else {
                    let p = normalize_person(&raw, &self.options.aliases);
                    self.last_person = Some(p.clone());
                    p
                }
            }
            // Activity-only tables: entries are unattributed
            None => String::new(),
        };

        let activity_text = normalize_text(&sheet.cell(row, self.cols.activity).render());
        if activity_text.is_empty() {
            return Some(reject(sheet, row, "missing activity"));
        }

        let duration_minutes = match self.cols.duration {
            Some(col) => match cell_minutes(sheet.cell(row, col)) {
                Ok(m) => m,
                Err(e) => return Some(reject(sheet, row, e.to_string())),
            },
            None => 0,
        };

        let ctx: Vec<(&str, &str)> = context.iter().map(|(k, v)| (*k, v.as_str())).collect();
        Some(RowOutcome::Entry(EntryCandidate {
            source_kind: self.kind,
            source_document: sheet.document.clone(),
            row_index: (row + 1) as u32,
            entry_date,
            person,
            activity_text,
            duration_minutes,
            raw_row_hash: row_hash(&sheet.rendered_row(row), &ctx),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::extract_sheet;
    use crate::sheet::RawCell;
    use sitediary_core::normalize::AliasTable;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn run(sheet: &RawSheet) -> Vec<RowOutcome> {
        let opts = AdapterOptions::default();
        HeaderTableAdapter.extract(sheet, SourceKind::Client, &opts).unwrap().collect()
    }

    #[test]
    fn header_below_preamble_with_synonyms() {
        let sheet = RawSheet::from_text_rows(
            "client/a.xlsx::Week 1",
            "Week 1",
            &[
                vec!["ACME Civil - Daily Diary"],
                vec![""],
                vec!["Diary Date", "Employee", "Work Performed", "Hrs"],
                vec!["01/02/2025", "John  Doe", " Site inspection visit ", "2"],
                vec!["", "", "", ""],
                vec!["02/02/2025", "Jane Roe", "Trenching", "7.5"],
                vec!["Total", "", "", "9.5"],
            ],
        );
        let out = run(&sheet);
        assert_eq!(out.len(), 2);
        let RowOutcome::Entry(first) = &out[0] else { panic!("expected entry") };
        assert_eq!(first.row_index, 4);
        assert_eq!(first.entry_date, ymd(2025, 2, 1));
        assert_eq!(first.person, "john doe");
        assert_eq!(first.activity_text, "Site inspection visit");
        assert_eq!(first.duration_minutes, 120);
        let RowOutcome::Entry(second) = &out[1] else { panic!("expected entry") };
        assert_eq!(second.duration_minutes, 450);
    }

    #[test]
    fn merged_cells_filled_down() {
        let sheet = RawSheet::from_text_rows(
            "d::s",
            "s",
            &[
                vec!["Date", "Name", "Activity", "Hours"],
                vec!["03/10/2025", "Worker One", "Excavation", "4"],
                vec!["", "", "Backfill", "4"],
            ],
        );
        let out = run(&sheet);
        let RowOutcome::Entry(filled) = &out[1] else { panic!("expected entry") };
        assert_eq!(filled.entry_date, ymd(2025, 10, 3));
        assert_eq!(filled.person, "worker one");
        assert_eq!(filled.row_index, 3);
    }

    #[test]
    fn bad_cells_become_rejections() {
        let sheet = RawSheet::from_text_rows(
            "d::s",
            "s",
            &[
                vec!["Date", "Name", "Activity", "Hours"],
                vec!["sometime", "A B", "Task", "1"],
                vec!["03/10/2025", "A B", "Task", "lots"],
                vec!["03/10/2025", "A B", "", "1"],
                vec!["03/10/2025", "A B", "Task", "-1"],
            ],
        );
        let reasons: Vec<String> = run(&sheet)
            .into_iter()
            .map(|o| match o {
                RowOutcome::Rejected(r) => format!("{}:{}", r.row_index, r.reason),
                RowOutcome::Entry(e) => panic!("unexpected entry {e:?}"),
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                "2:unparseable date 'sometime'",
                "3:non-numeric duration 'lots'",
                "4:missing activity",
                "5:negative duration '-1'",
            ]
        );
    }

    #[test]
    fn blank_date_after_bad_date_is_not_filled() {
        let sheet = RawSheet::from_text_rows(
            "d::s",
            "s",
            &[
                vec!["Date", "Name", "Activity"],
                vec!["??", "A B", "Task"],
                vec!["", "A B", "Task"],
            ],
        );
        let out = run(&sheet);
        assert!(matches!(&out[1], RowOutcome::Rejected(r) if r.reason == "missing date"));
    }

    #[test]
    fn sheet_level_date_from_preamble() {
        let sheet = RawSheet::new(
            "d::s",
            "s",
            vec![
                vec![RawCell::Text("Report date".into()), RawCell::Date(45689.0)],
                vec![RawCell::Text("Name".into()), RawCell::Text("Description".into())],
                vec![RawCell::Text("J. Doe".into()), RawCell::Text("Site inspection".into())],
            ],
        );
        let out = run(&sheet);
        let RowOutcome::Entry(e) = &out[0] else { panic!("expected entry") };
        assert_eq!(e.entry_date, ymd(2025, 2, 1));
        assert_eq!(e.person, "j. doe");
    }

    #[test]
    fn sheet_date_is_part_of_row_identity() {
        let make = |serial: f64| {
            RawSheet::new(
                "d::s",
                "s",
                vec![
                    vec![RawCell::Date(serial)],
                    vec![RawCell::Text("Name".into()), RawCell::Text("Activity".into())],
                    vec![RawCell::Text("A B".into()), RawCell::Text("Task".into())],
                ],
            )
        };
        let hash = |sheet: &RawSheet| match &run(sheet)[0] {
            RowOutcome::Entry(e) => e.raw_row_hash.clone(),
            RowOutcome::Rejected(r) => panic!("{r}"),
        };
        assert_ne!(hash(&make(45689.0)), hash(&make(45690.0)));
    }

    #[test]
    fn no_date_anywhere_is_sheet_error() {
        let sheet = RawSheet::from_text_rows("d::s", "s", &[vec!["Name", "Activity"], vec!["A B", "Task"]]);
        let opts = AdapterOptions::default();
        let err = HeaderTableAdapter.extract(&sheet, SourceKind::Client, &opts).err();
        assert!(matches!(err, Some(AdapterError::MissingSheetDate { .. })));
    }

    #[test]
    fn header_outside_scan_window_is_not_found() {
        let mut rows: Vec<Vec<&str>> = vec![vec!["filler"]; 30];
        rows.push(vec!["Date", "Name", "Activity"]);
        rows.push(vec!["03/10/2025", "A B", "Task"]);
        let sheet = RawSheet::from_text_rows("d::s", "s", &rows);
        let opts = AdapterOptions::default();
        assert!(!HeaderTableAdapter.accepts(&sheet, SourceKind::Client, &opts));

        let wide = AdapterOptions { header_scan_rows: 40, ..AdapterOptions::default() };
        assert_eq!(extract_sheet(&sheet, SourceKind::Client, &wide).unwrap().candidates.len(), 1);
    }

    #[test]
    fn aliases_applied_to_person() {
        let sheet = RawSheet::from_text_rows(
            "d::s",
            "s",
            &[vec!["Date", "Name", "Activity"], vec!["03/10/2025", "Johnny Doe", "Task"]],
        );
        let opts = AdapterOptions {
            aliases: [("johnny doe", "john doe")].into_iter().collect::<AliasTable>(),
            ..AdapterOptions::default()
        };
        let out: Vec<RowOutcome> = HeaderTableAdapter.extract(&sheet, SourceKind::Client, &opts).unwrap().collect();
        assert!(matches!(&out[0], RowOutcome::Entry(e) if e.person == "john doe"));
    }
}
