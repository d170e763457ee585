//! `sitediary-store`: the persistent diary store.
//!
//! Owns the SQLite schema and its migration, full rebuild and incremental
//! ingestion, drift validation, and the narrow audit write-back interface.
//! A run either commits completely or not at all.

pub mod error;
pub mod ingest;
pub mod schema;
pub mod store;
pub mod validate;

pub use error::StoreError;
pub use ingest::{IngestMode, IngestSummary};
pub use schema::SCHEMA_VERSION;
pub use store::{DailyTotal, IngestRun, Store, StoreOptions};
pub use validate::{Divergence, ValidationReport};
