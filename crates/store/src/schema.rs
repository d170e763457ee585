// Store schema and in-place migration

use rusqlite::{Connection, TransactionBehavior};

use crate::error::{is_busy, StoreError};

/// Bump when the schema changes. Stored in `PRAGMA user_version`.
///
/// 1: entries without audit columns. 2: audit columns, runs, rejections, totals view.
pub const SCHEMA_VERSION: i64 = 2;

const BASE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS diary_entries (
    entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_kind TEXT NOT NULL,            -- 'client' | 'supervisor'
    source_document TEXT NOT NULL,        -- '<relative path>::<sheet>'
    row_index INTEGER NOT NULL,           -- 1-based row within the sheet
    entry_date TEXT NOT NULL,             -- ISO yyyy-mm-dd
    person TEXT NOT NULL,
    activity_text TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL,
    raw_row_hash TEXT NOT NULL,
    UNIQUE (source_document, raw_row_hash)
);

CREATE INDEX IF NOT EXISTS idx_diary_entries_date ON diary_entries (entry_date);

CREATE TABLE IF NOT EXISTS ingest_runs (
    run_id INTEGER PRIMARY KEY AUTOINCREMENT,
    mode TEXT NOT NULL,                   -- 'rebuild' | 'incremental'
    started_at TEXT NOT NULL,
    finished_at TEXT,
    files_scanned INTEGER NOT NULL DEFAULT 0,
    sheets_parsed INTEGER NOT NULL DEFAULT 0,
    entries_inserted INTEGER NOT NULL DEFAULT 0,
    entries_unchanged INTEGER NOT NULL DEFAULT 0,
    file_warnings INTEGER NOT NULL DEFAULT 0,
    rejections INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS row_rejections (
    run_id INTEGER NOT NULL REFERENCES ingest_runs (run_id),
    source_document TEXT NOT NULL,
    row_index INTEGER NOT NULL,
    reason TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE VIEW IF NOT EXISTS daily_entry_totals AS
    SELECT entry_date,
           source_kind,
           COUNT(*) AS entries,
           SUM(duration_minutes) AS minutes
    FROM diary_entries
    GROUP BY entry_date, source_kind;
"#;

/// Columns added after version 1. Each is added only when missing.
const AUDIT_COLUMNS: &[(&str, &str)] = &[
    ("audit_status", "TEXT"),
    ("audit_model", "TEXT"),
    ("audit_timestamp", "TEXT"),
    ("audit_notes", "TEXT"),
];

pub(crate) fn user_version(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Bring the schema up to [`SCHEMA_VERSION`] in a single transaction.
///
/// Safe to run any number of times against stores of any older version.
/// Busy stores report `Busy`; everything else is a `Migration` failure and
/// leaves the store untouched.
pub fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    let current = user_version(conn).map_err(migration_error)?;
    if current > SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "store schema version {current} is newer than this build supports ({SCHEMA_VERSION})"
        )));
    }
    if current == SCHEMA_VERSION && has_columns(conn, "diary_entries", AUDIT_COLUMNS).map_err(migration_error)? {
        return Ok(());
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(migration_error)?;
    tx.execute_batch(BASE_SCHEMA).map_err(migration_error)?;
    for (column, definition) in AUDIT_COLUMNS {
        ensure_column(&tx, "diary_entries", column, definition).map_err(migration_error)?;
    }
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_diary_entries_unaudited ON diary_entries (audit_status, entry_id);",
    )
    .map_err(migration_error)?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION).map_err(migration_error)?;
    tx.execute(
        "INSERT INTO store_meta (key, value) VALUES ('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [SCHEMA_VERSION.to_string()],
    )
    .map_err(migration_error)?;
    tx.commit().map_err(migration_error)?;

    if current != SCHEMA_VERSION {
        log::info!("store schema migrated from version {current} to {SCHEMA_VERSION}");
    }
    Ok(())
}

fn migration_error(e: rusqlite::Error) -> StoreError {
    if is_busy(&e) {
        StoreError::Busy
    } else {
        StoreError::Migration(e.to_string())
    }
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    names.collect()
}

fn has_columns(conn: &Connection, table: &str, columns: &[(&str, &str)]) -> Result<bool, rusqlite::Error> {
    let existing = table_columns(conn, table)?;
    Ok(columns.iter().all(|(c, _)| existing.iter().any(|e| e == c)))
}

/// `ALTER TABLE ADD COLUMN` unless the column is already there.
fn ensure_column(conn: &Connection, table: &str, column: &str, definition: &str) -> Result<(), rusqlite::Error> {
    if table_columns(conn, table)?.iter().any(|c| c == column) {
        return Ok(());
    }
    conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"))?;
    log::debug!("added column {table}.{column}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_gets_current_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(user_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(has_columns(&conn, "diary_entries", AUDIT_COLUMNS).unwrap());
    }

    #[test]
    fn migration_is_repeatable() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        // Force the slow path again
        conn.pragma_update(None, "user_version", 1).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        let cols = table_columns(&conn, "diary_entries").unwrap();
        assert_eq!(cols.iter().filter(|c| c.as_str() == "audit_status").count(), 1);
    }

    #[test]
    fn newer_store_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1).unwrap();
        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}
