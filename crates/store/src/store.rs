use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use sitediary_core::{AuditResult, AuditStatus, DiaryEntry, SourceKind};

use crate::error::StoreError;
use crate::schema::migrate;

/// Column list shared by every entry query; order matches [`RawEntry::from_row`].
pub(crate) const ENTRY_COLUMNS: &str = "entry_id, source_kind, source_document, row_index, entry_date, person, \
     activity_text, duration_minutes, raw_row_hash, audit_status, audit_model, audit_timestamp, audit_notes";

#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// How long to wait for another writer. Zero fails fast with `Busy`.
    pub busy_timeout_ms: u64,
}

/// Handle to one diary store. Every operation goes through an explicit
/// handle; there is no process-wide store.
pub struct Store {
    pub(crate) conn: Connection,
}

/// One row of the `daily_entry_totals` view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub entry_date: String,
    pub source_kind: String,
    pub entries: i64,
    pub minutes: i64,
}

/// One row of `ingest_runs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestRun {
    pub run_id: i64,
    pub mode: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub files_scanned: i64,
    pub sheets_parsed: i64,
    pub entries_inserted: i64,
    pub entries_unchanged: i64,
    pub file_warnings: i64,
    pub rejections: i64,
}

impl Store {
    /// Open (or create) the store at `path` and bring its schema up to date.
    pub fn open(path: &Path, options: &StoreOptions) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        log::debug!("opened store {}", path.display());
        Self::from_connection(conn, options)
    }

    /// Isolated store for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, &StoreOptions::default())
    }

    fn from_connection(mut conn: Connection, options: &StoreOptions) -> Result<Self, StoreError> {
        // rusqlite defaults to a 5s wait; single-writer discipline wants an explicit value
        conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
        migrate(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn entry_count(&self) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row("SELECT COUNT(*) FROM diary_entries", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// All entries in `entry_id` order.
    pub fn entries(&self) -> Result<Vec<DiaryEntry>, StoreError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM diary_entries ORDER BY entry_id");
        self.query_entries(&sql, params![])
    }

    pub fn entry(&self, entry_id: i64) -> Result<Option<DiaryEntry>, StoreError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM diary_entries WHERE entry_id = ?1");
        let raw = self
            .conn
            .query_row(&sql, [entry_id], RawEntry::from_row)
            .optional()?;
        raw.map(RawEntry::into_entry).transpose()
    }

    /// Up to `limit` entries the audit collaborator has not looked at yet,
    /// oldest first.
    pub fn fetch_unaudited(&self, limit: usize) -> Result<Vec<DiaryEntry>, StoreError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM diary_entries WHERE audit_status IS NULL ORDER BY entry_id LIMIT ?1"
        );
        self.query_entries(&sql, [limit as i64])
    }

    /// Record one audit verdict. The only mutation an entry ever sees after
    /// ingestion.
    pub fn apply_audit(&self, result: &AuditResult) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE diary_entries
             SET audit_status = ?1, audit_model = ?2, audit_timestamp = ?3, audit_notes = ?4
             WHERE entry_id = ?5",
            params![
                result.status.as_str(),
                result.model,
                result.timestamp,
                result.notes,
                result.entry_id
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownEntry(result.entry_id));
        }
        log::debug!("entry {} audited {}", result.entry_id, result.status);
        Ok(())
    }

    pub fn daily_totals(&self) -> Result<Vec<DailyTotal>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_date, source_kind, entries, minutes
             FROM daily_entry_totals
             ORDER BY entry_date, source_kind",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DailyTotal {
                entry_date: row.get(0)?,
                source_kind: row.get(1)?,
                entries: row.get(2)?,
                minutes: row.get(3)?,
            })
        })?;
        let mut totals = Vec::new();
        for row in rows {
            totals.push(row?);
        }
        Ok(totals)
    }

    /// Most recent runs first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<IngestRun>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, mode, started_at, finished_at, files_scanned, sheets_parsed,
                    entries_inserted, entries_unchanged, file_warnings, rejections
             FROM ingest_runs
             ORDER BY run_id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(IngestRun {
                run_id: row.get(0)?,
                mode: row.get(1)?,
                started_at: row.get(2)?,
                finished_at: row.get(3)?,
                files_scanned: row.get(4)?,
                sheets_parsed: row.get(5)?,
                entries_inserted: row.get(6)?,
                entries_unchanged: row.get(7)?,
                file_warnings: row.get(8)?,
                rejections: row.get(9)?,
            })
        })?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }

    pub fn meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM store_meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub(crate) fn query_entries<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<DiaryEntry>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, RawEntry::from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }
}

/// An entry row before its text columns are parsed back into typed values.
#[derive(Debug, Clone)]
pub(crate) struct RawEntry {
    pub entry_id: i64,
    pub source_kind: String,
    pub source_document: String,
    pub row_index: i64,
    pub entry_date: String,
    pub person: String,
    pub activity_text: String,
    pub duration_minutes: i64,
    pub raw_row_hash: String,
    pub audit_status: Option<String>,
    pub audit_model: Option<String>,
    pub audit_timestamp: Option<String>,
    pub audit_notes: Option<String>,
}

impl RawEntry {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            entry_id: row.get(0)?,
            source_kind: row.get(1)?,
            source_document: row.get(2)?,
            row_index: row.get(3)?,
            entry_date: row.get(4)?,
            person: row.get(5)?,
            activity_text: row.get(6)?,
            duration_minutes: row.get(7)?,
            raw_row_hash: row.get(8)?,
            audit_status: row.get(9)?,
            audit_model: row.get(10)?,
            audit_timestamp: row.get(11)?,
            audit_notes: row.get(12)?,
        })
    }

    pub(crate) fn parsed_date(&self) -> Result<NaiveDate, StoreError> {
        NaiveDate::parse_from_str(&self.entry_date, "%Y-%m-%d").map_err(|_| StoreError::InvalidRow {
            entry_id: self.entry_id,
            message: format!("entry_date '{}' is not an ISO date", self.entry_date),
        })
    }

    pub(crate) fn into_entry(self) -> Result<DiaryEntry, StoreError> {
        let entry_date = self.parsed_date()?;
        let invalid = |message: String| StoreError::InvalidRow { entry_id: self.entry_id, message };
        let source_kind: SourceKind = self.source_kind.parse().map_err(|e: sitediary_core::NormalizeError| invalid(e.to_string()))?;
        let audit_status = self
            .audit_status
            .as_deref()
            .map(str::parse::<AuditStatus>)
            .transpose()
            .map_err(invalid)?;
        Ok(DiaryEntry {
            entry_id: self.entry_id,
            source_kind,
            source_document: self.source_document,
            row_index: self.row_index as u32,
            entry_date,
            person: self.person,
            activity_text: self.activity_text,
            duration_minutes: self.duration_minutes,
            raw_row_hash: self.raw_row_hash,
            audit_status,
            audit_model: self.audit_model,
            audit_timestamp: self.audit_timestamp,
            audit_notes: self.audit_notes,
        })
    }
}
