// Whole-tree extraction: every configured source folder, every file, every sheet.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sitediary_core::{EntryCandidate, FileWarning, RowRejection, SourceKind};

use crate::adapter::{extract_sheet, AdapterOptions};
use crate::discover::{discover_files, relative_label};
use crate::error::AdapterError;
use crate::sheet::{load_csv, load_workbook, RawSheet};

/// One source folder and the population that wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub kind: SourceKind,
    /// Relative to the project root unless absolute.
    pub dir: PathBuf,
}

impl SourceSpec {
    pub fn new(kind: SourceKind, dir: impl Into<PathBuf>) -> Self {
        Self { kind, dir: dir.into() }
    }

    /// The two conventional folders.
    pub fn defaults() -> Vec<SourceSpec> {
        vec![
            SourceSpec::new(SourceKind::Client, crate::DEFAULT_CLIENT_DIR),
            SourceSpec::new(SourceKind::Supervisor, crate::DEFAULT_SUPERVISOR_DIR),
        ]
    }
}

/// Candidates from one sheet, in row order.
#[derive(Debug, Clone)]
pub struct DocumentExtraction {
    pub source_document: String,
    pub kind: SourceKind,
    pub adapter: &'static str,
    pub candidates: Vec<EntryCandidate>,
}

#[derive(Debug, Clone, Default)]
pub struct TreeExtraction {
    /// Sorted by `source_document`.
    pub documents: Vec<DocumentExtraction>,
    pub warnings: Vec<FileWarning>,
    pub rejections: Vec<RowRejection>,
    pub files_scanned: usize,
    pub sheets_parsed: usize,
}

impl TreeExtraction {
    /// All candidates in `(source_document, row_index)` order.
    pub fn candidates(&self) -> impl Iterator<Item = &EntryCandidate> {
        self.documents.iter().flat_map(|d| d.candidates.iter())
    }

    pub fn candidate_count(&self) -> usize {
        self.documents.iter().map(|d| d.candidates.len()).sum()
    }

    pub fn has_document(&self, source_document: &str) -> bool {
        self.documents
            .binary_search_by(|d| d.source_document.as_str().cmp(source_document))
            .is_ok()
    }

    fn warn(&mut self, source: impl Into<String>, reason: impl Into<String>) {
        let warning = FileWarning { source: source.into(), reason: reason.into() };
        log::warn!("skipped {warning}");
        self.warnings.push(warning);
    }
}

/// Read every sheet of one file. The outer error is file-level; inner
/// errors are single sheets that could not be read.
pub fn load_document(root: &Path, path: &Path) -> Result<Vec<Result<RawSheet, AdapterError>>, AdapterError> {
    let label = relative_label(root, path);
    let is_csv = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        Ok(vec![load_csv(path, &label)])
    } else {
        load_workbook(path, &label)
    }
}

/// Walk every source folder under `root` and run each sheet through its adapter.
///
/// Never fails as a whole: unreadable files, unrecognized sheets and missing
/// folders become warnings, bad rows become rejections.
pub fn extract_tree(root: &Path, sources: &[SourceSpec], options: &AdapterOptions) -> TreeExtraction {
    let mut out = TreeExtraction::default();

    for spec in sources {
        let dir = root.join(&spec.dir);
        if !dir.is_dir() {
            out.warn(dir.display().to_string(), format!("{} source folder not found", spec.kind));
            continue;
        }
        let files = match discover_files(&dir, &options.extensions) {
            Ok(files) => files,
            Err(e) => {
                out.warn(dir.display().to_string(), e.to_string());
                continue;
            }
        };
        log::info!("{}: {} file(s) in {}", spec.kind, files.len(), dir.display());

        for path in files {
            out.files_scanned += 1;
            let sheets = match load_document(root, &path) {
                Ok(sheets) => sheets,
                Err(e) => {
                    out.warn(relative_label(root, &path), e.to_string());
                    continue;
                }
            };
            for sheet in sheets {
                let sheet = match sheet {
                    Ok(sheet) => sheet,
                    Err(e) => {
                        out.warn(relative_label(root, &path), e.to_string());
                        continue;
                    }
                };
                match extract_sheet(&sheet, spec.kind, options) {
                    Ok(extraction) => {
                        out.sheets_parsed += 1;
                        out.rejections.extend(extraction.rejections);
                        out.documents.push(DocumentExtraction {
                            source_document: sheet.document,
                            kind: spec.kind,
                            adapter: extraction.adapter,
                            candidates: extraction.candidates,
                        });
                    }
                    Err(e) => out.warn(sheet.document, e.to_string()),
                }
            }
        }
    }

    out.documents.sort_by(|a, b| a.source_document.cmp(&b.source_document));
    for doc in &mut out.documents {
        doc.candidates.sort_by_key(|c| c.row_index);
    }
    out.rejections
        .sort_by(|a, b| (&a.source_document, a.row_index).cmp(&(&b.source_document, b.row_index)));
    out
}
