// Rebuild and incremental ingestion

use std::fmt;
use std::path::Path;

use rusqlite::{params, Transaction, TransactionBehavior};
use serde::Serialize;
use sitediary_core::{FileWarning, RowRejection};
use sitediary_io::{extract_tree, AdapterOptions, SourceSpec, TreeExtraction};

use crate::error::StoreError;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    Rebuild,
    Incremental,
}

impl IngestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rebuild => "rebuild",
            Self::Incremental => "incremental",
        }
    }
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one ingest run did. Warnings and rejections are always complete;
/// use the `sample_*` helpers for terse output.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub mode: IngestMode,
    pub run_id: i64,
    pub files_scanned: usize,
    pub sheets_parsed: usize,
    pub entries_inserted: usize,
    /// Rows whose `(source_document, raw_row_hash)` was already stored.
    pub entries_unchanged: usize,
    pub file_warnings: Vec<FileWarning>,
    pub rejections: Vec<RowRejection>,
}

impl IngestSummary {
    pub fn sample_warnings(&self, n: usize) -> &[FileWarning] {
        &self.file_warnings[..n.min(self.file_warnings.len())]
    }

    pub fn sample_rejections(&self, n: usize) -> &[RowRejection] {
        &self.rejections[..n.min(self.rejections.len())]
    }
}

impl Store {
    /// Drop every entry and re-ingest the whole tree.
    ///
    /// Entry ids are assigned in `(source_document, row_index)` order, so two
    /// rebuilds of an unchanged tree produce the same rows in the same order.
    /// Ids are never reused: after a reset numbering continues from the
    /// previous high-water mark.
    pub fn reset_and_rebuild(
        &mut self,
        root: &Path,
        sources: &[SourceSpec],
        options: &AdapterOptions,
    ) -> Result<IngestSummary, StoreError> {
        let extraction = extract_tree(root, sources, options);
        self.persist(IngestMode::Rebuild, extraction)
    }

    /// Insert only rows not already stored. Entries from files that have
    /// since disappeared are kept.
    pub fn ingest_incremental(
        &mut self,
        root: &Path,
        sources: &[SourceSpec],
        options: &AdapterOptions,
    ) -> Result<IngestSummary, StoreError> {
        let extraction = extract_tree(root, sources, options);
        self.persist(IngestMode::Incremental, extraction)
    }

    /// Write one extraction under a single exclusive transaction. Nothing is
    /// committed unless every statement succeeds.
    pub fn persist(&mut self, mode: IngestMode, extraction: TreeExtraction) -> Result<IngestSummary, StoreError> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Exclusive)?;
        let started_at = chrono::Utc::now().to_rfc3339();

        if mode == IngestMode::Rebuild {
            let dropped = tx.execute("DELETE FROM diary_entries", [])?;
            log::info!("reset: dropped {dropped} entries");
            tx.execute(
                "INSERT INTO store_meta (key, value) VALUES ('last_reset_at', ?1)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [&started_at],
            )?;
        }

        tx.execute(
            "INSERT INTO ingest_runs (mode, started_at) VALUES (?1, ?2)",
            params![mode.as_str(), started_at],
        )?;
        let run_id = tx.last_insert_rowid();

        let (inserted, unchanged) = insert_candidates(&tx, &extraction)?;
        insert_rejections(&tx, run_id, &extraction.rejections)?;

        tx.execute(
            "UPDATE ingest_runs
             SET finished_at = ?1, files_scanned = ?2, sheets_parsed = ?3, entries_inserted = ?4,
                 entries_unchanged = ?5, file_warnings = ?6, rejections = ?7
             WHERE run_id = ?8",
            params![
                chrono::Utc::now().to_rfc3339(),
                extraction.files_scanned as i64,
                extraction.sheets_parsed as i64,
                inserted as i64,
                unchanged as i64,
                extraction.warnings.len() as i64,
                extraction.rejections.len() as i64,
                run_id
            ],
        )?;
        tx.commit()?;

        log::info!(
            "{mode}: {inserted} inserted, {unchanged} unchanged, {} rejected, {} file(s) skipped",
            extraction.rejections.len(),
            extraction.warnings.len()
        );

        Ok(IngestSummary {
            mode,
            run_id,
            files_scanned: extraction.files_scanned,
            sheets_parsed: extraction.sheets_parsed,
            entries_inserted: inserted,
            entries_unchanged: unchanged,
            file_warnings: extraction.warnings,
            rejections: extraction.rejections,
        })
    }
}

fn insert_candidates(tx: &Transaction<'_>, extraction: &TreeExtraction) -> Result<(usize, usize), StoreError> {
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO diary_entries
            (source_kind, source_document, row_index, entry_date, person, activity_text,
             duration_minutes, raw_row_hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;

    let mut inserted = 0;
    let mut unchanged = 0;
    for c in extraction.candidates() {
        let changed = stmt.execute(params![
            c.source_kind.as_str(),
            c.source_document,
            c.row_index,
            c.entry_date.to_string(),
            c.person,
            c.activity_text,
            c.duration_minutes,
            c.raw_row_hash,
        ])?;
        if changed == 0 {
            unchanged += 1;
        } else {
            inserted += 1;
        }
    }
    Ok((inserted, unchanged))
}

fn insert_rejections(tx: &Transaction<'_>, run_id: i64, rejections: &[RowRejection]) -> Result<(), StoreError> {
    let mut stmt = tx.prepare(
        "INSERT INTO row_rejections (run_id, source_document, row_index, reason) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for r in rejections {
        stmt.execute(params![run_id, r.source_document, r.row_index, r.reason])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sitediary_core::{EntryCandidate, SourceKind};
    use sitediary_io::DocumentExtraction;

    fn candidate(doc: &str, row: u32, hash: &str) -> EntryCandidate {
        EntryCandidate {
            source_kind: SourceKind::Client,
            source_document: doc.into(),
            row_index: row,
            entry_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            person: "john doe".into(),
            activity_text: "Site inspection".into(),
            duration_minutes: 120,
            raw_row_hash: hash.into(),
        }
    }

    fn extraction(candidates: Vec<EntryCandidate>) -> TreeExtraction {
        TreeExtraction {
            documents: vec![DocumentExtraction {
                source_document: "a.csv::a".into(),
                kind: SourceKind::Client,
                adapter: "header-table",
                candidates,
            }],
            files_scanned: 1,
            sheets_parsed: 1,
            ..Default::default()
        }
    }

    #[test]
    fn identical_rows_in_one_document_collapse() {
        let mut store = Store::open_in_memory().unwrap();
        let ext = extraction(vec![
            candidate("a.csv::a", 2, "sha256:aa"),
            candidate("a.csv::a", 3, "sha256:aa"),
            candidate("a.csv::a", 4, "sha256:bb"),
        ]);
        let summary = store.persist(IngestMode::Incremental, ext).unwrap();
        assert_eq!(summary.entries_inserted, 2);
        assert_eq!(summary.entries_unchanged, 1);
        assert_eq!(store.entry_count().unwrap(), 2);
    }

    #[test]
    fn runs_are_recorded() {
        let mut store = Store::open_in_memory().unwrap();
        store.persist(IngestMode::Rebuild, extraction(vec![candidate("a.csv::a", 2, "sha256:aa")])).unwrap();
        store.persist(IngestMode::Incremental, extraction(vec![candidate("a.csv::a", 2, "sha256:aa")])).unwrap();

        let runs = store.recent_runs(10).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].mode, "incremental");
        assert_eq!(runs[0].entries_inserted, 0);
        assert_eq!(runs[0].entries_unchanged, 1);
        assert_eq!(runs[1].mode, "rebuild");
        assert!(runs[1].finished_at.is_some());
        assert!(store.meta("last_reset_at").unwrap().is_some());
    }

    #[test]
    fn ids_continue_after_reset() {
        let mut store = Store::open_in_memory().unwrap();
        store.persist(IngestMode::Rebuild, extraction(vec![candidate("a.csv::a", 2, "sha256:aa")])).unwrap();
        let first = store.entries().unwrap()[0].entry_id;
        store.persist(IngestMode::Rebuild, extraction(vec![candidate("a.csv::a", 2, "sha256:aa")])).unwrap();
        let second = store.entries().unwrap()[0].entry_id;
        assert!(second > first);
    }

    #[test]
    fn sample_helpers_clamp() {
        let summary = IngestSummary {
            mode: IngestMode::Incremental,
            run_id: 1,
            files_scanned: 0,
            sheets_parsed: 0,
            entries_inserted: 0,
            entries_unchanged: 0,
            file_warnings: vec![FileWarning { source: "x".into(), reason: "y".into() }],
            rejections: Vec::new(),
        };
        assert_eq!(summary.sample_warnings(5).len(), 1);
        assert!(summary.sample_rejections(5).is_empty());
    }
}
