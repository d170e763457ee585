use thiserror::Error;

/// Failures while turning source files into entry candidates.
///
/// None of these abort an ingest run. Whole-file and whole-sheet failures
/// surface as warnings; row-level problems are `RowRejection`s.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("cannot open {path}: {message}")]
    Open { path: String, message: String },

    #[error("cannot read {document}: {message}")]
    Read { document: String, message: String },

    #[error("{sheet}: no recognizable diary layout in the first {scanned} rows")]
    SchemaDetection { sheet: String, scanned: usize },

    #[error("{sheet}: table has no date column and no report date was found above it")]
    MissingSheetDate { sheet: String },

    #[error("cannot scan {dir}: {message}")]
    Discovery { dir: String, message: String },
}
