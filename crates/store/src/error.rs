use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Another connection holds the write lock. Nothing was changed.
    #[error("store is busy: another rebuild, refresh or validate is running against it; retry once it finishes")]
    Busy,

    /// Schema upgrade failed; the store was left as it was.
    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("no diary entry with id {0}")]
    UnknownEntry(i64),

    #[error("stored entry {entry_id} is unreadable: {message}")]
    InvalidRow { entry_id: i64, message: String },

    #[error("failed to create store directory: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if is_busy(&e) {
            StoreError::Busy
        } else {
            StoreError::Sqlite(e)
        }
    }
}

pub(crate) fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if matches!(f.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
