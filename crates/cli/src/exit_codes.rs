//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `sdiary` exit codes.
//! Scripts rely on them; do not renumber.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success (row rejections and skipped files included)       |
//! | 1    | General error                                             |
//! | 2    | Usage error (bad arguments, missing root, bad output dir)  |
//! | 3    | `validate` found divergence between files and store       |
//! | 4    | Store schema migration failed; nothing was touched        |
//! | 5    | Store busy: another run holds it; retry serially          |
//! | 6    | Settings file unreadable or invalid                       |

use sitediary_store::StoreError;

/// Success - command completed. Rejected rows alone never change this.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing directories.
pub const EXIT_USAGE: u8 = 2;

/// `validate` found at least one divergence.
pub const EXIT_DIVERGENCE: u8 = 3;

/// Schema migration failed.
pub const EXIT_MIGRATION: u8 = 4;

/// Store held by another run.
pub const EXIT_BUSY: u8 = 5;

/// Settings could not be loaded.
pub const EXIT_CONFIG: u8 = 6;

/// Map a store error to its exit code.
pub fn store_exit_code(err: &StoreError) -> u8 {
    match err {
        StoreError::Busy => EXIT_BUSY,
        StoreError::Migration(_) => EXIT_MIGRATION,
        StoreError::UnknownEntry(_) => EXIT_USAGE,
        StoreError::Sqlite(_) | StoreError::InvalidRow { .. } | StoreError::Io(_) => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_distinct_codes() {
        assert_eq!(store_exit_code(&StoreError::Busy), EXIT_BUSY);
        assert_eq!(store_exit_code(&StoreError::Migration("x".into())), EXIT_MIGRATION);
        assert_eq!(store_exit_code(&StoreError::UnknownEntry(4)), EXIT_USAGE);
    }

    #[test]
    fn codes_are_unique() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_DIVERGENCE,
            EXIT_MIGRATION,
            EXIT_BUSY,
            EXIT_CONFIG,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
