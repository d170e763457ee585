// Drift check between the source tree and the store

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use rusqlite::TransactionBehavior;
use serde::Serialize;
use sitediary_core::FileWarning;
use sitediary_io::{extract_tree, AdapterOptions, SourceSpec};

use crate::error::StoreError;
use crate::store::{RawEntry, Store, ENTRY_COLUMNS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Divergence {
    /// Stored entries whose source sheet no longer exists (or no longer parses).
    MissingDocument { source_document: String, entries: usize },
    /// A row the tree would produce that is not in the store.
    UningestedRow { source_document: String, row_index: u32, raw_row_hash: String },
    /// A stored entry whose sheet still exists but no longer produces its row.
    OrphanedEntry { entry_id: i64, source_document: String, row_index: u32 },
    InvalidStoredDate { entry_id: i64, value: String },
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDocument { source_document, entries } => {
                write!(f, "{source_document}: source missing ({entries} stored entries)")
            }
            Self::UningestedRow { source_document, row_index, .. } => {
                write!(f, "{source_document} row {row_index}: not ingested")
            }
            Self::OrphanedEntry { entry_id, source_document, row_index } => {
                write!(f, "{source_document} row {row_index}: entry {entry_id} no longer in source")
            }
            Self::InvalidStoredDate { entry_id, value } => {
                write!(f, "entry {entry_id}: stored date '{value}' is not a valid date")
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub files_scanned: usize,
    pub documents_checked: usize,
    pub entries_checked: usize,
    pub divergences: Vec<Divergence>,
    pub file_warnings: Vec<FileWarning>,
    pub rejections: usize,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.divergences.is_empty()
    }
}

impl Store {
    /// Compare what ingestion would produce from `root` against what is
    /// stored. Read-only; holds the write lock for the comparison so it fails
    /// fast with `Busy` while a rebuild or refresh is running.
    pub fn validate(
        &mut self,
        root: &Path,
        sources: &[SourceSpec],
        options: &AdapterOptions,
    ) -> Result<ValidationReport, StoreError> {
        let extraction = extract_tree(root, sources, options);

        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stored: Vec<RawEntry> = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM diary_entries ORDER BY source_document, row_index, entry_id"
            ))?;
            let rows = stmt.query_map([], RawEntry::from_row)?;
            rows.collect::<Result<_, _>>()?
        };
        // Read-only: nothing to commit
        tx.rollback()?;

        let mut report = ValidationReport {
            files_scanned: extraction.files_scanned,
            documents_checked: extraction.documents.len(),
            entries_checked: stored.len(),
            file_warnings: extraction.warnings.clone(),
            rejections: extraction.rejections.len(),
            ..Default::default()
        };

        let expected: BTreeSet<(&str, &str)> = extraction.candidates().map(|c| c.identity()).collect();
        let present: BTreeSet<(&str, &str)> = stored
            .iter()
            .map(|e| (e.source_document.as_str(), e.raw_row_hash.as_str()))
            .collect();

        let mut missing_docs: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in &stored {
            if entry.parsed_date().is_err() {
                report.divergences.push(Divergence::InvalidStoredDate {
                    entry_id: entry.entry_id,
                    value: entry.entry_date.clone(),
                });
            }
            if !extraction.has_document(&entry.source_document) {
                *missing_docs.entry(&entry.source_document).or_default() += 1;
            } else if !expected.contains(&(entry.source_document.as_str(), entry.raw_row_hash.as_str())) {
                report.divergences.push(Divergence::OrphanedEntry {
                    entry_id: entry.entry_id,
                    source_document: entry.source_document.clone(),
                    row_index: entry.row_index as u32,
                });
            }
        }
        for (doc, entries) in missing_docs {
            report.divergences.push(Divergence::MissingDocument { source_document: doc.to_string(), entries });
        }

        let mut seen = BTreeSet::new();
        for c in extraction.candidates() {
            if !present.contains(&c.identity()) && seen.insert(c.identity()) {
                report.divergences.push(Divergence::UningestedRow {
                    source_document: c.source_document.clone(),
                    row_index: c.row_index,
                    raw_row_hash: c.raw_row_hash.clone(),
                });
            }
        }

        if report.is_clean() {
            log::info!("validate: store matches {} document(s)", report.documents_checked);
        } else {
            log::warn!("validate: {} divergence(s)", report.divergences.len());
        }
        Ok(report)
    }
}
