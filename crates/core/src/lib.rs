//! `sitediary-core`: canonical diary record model.
//!
//! Every source row, whatever spreadsheet layout it came from, is normalized
//! into a [`DiaryEntry`] (or rejected with a [`RowRejection`]). No IO here.

pub mod audit;
pub mod date;
pub mod error;
pub mod hash;
pub mod model;
pub mod normalize;

pub use audit::{AuditResult, AuditStatus, AuditVerdict};
pub use error::NormalizeError;
pub use model::{DiaryEntry, EntryCandidate, FileWarning, RowRejection, SourceKind};
