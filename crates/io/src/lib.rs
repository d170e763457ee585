// Source document loading: discovery, raw sheets, layout adapters.

pub mod adapter;
pub mod discover;
pub mod error;
pub mod sheet;
pub mod tree;

pub use adapter::{
    extract_sheet, AdapterOptions, RowOutcome, SheetAdapter, SheetExtraction, DEFAULT_HEADER_SCAN_ROWS,
};
pub use discover::{discover_files, DEFAULT_EXTENSIONS};
pub use error::AdapterError;
pub use sheet::{RawCell, RawSheet};
pub use tree::{extract_tree, load_document, DocumentExtraction, SourceSpec, TreeExtraction};

/// Default folder holding client-submitted reports, relative to the project root.
pub const DEFAULT_CLIENT_DIR: &str = "001-Client reports";

/// Default folder holding supervisor reports, relative to the project root.
pub const DEFAULT_SUPERVISOR_DIR: &str = "002-Supervisor_Reports";
