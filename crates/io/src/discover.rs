// Source file discovery

use std::path::{Path, PathBuf};

use glob::{glob_with, MatchOptions, Pattern};

use crate::error::AdapterError;

pub const DEFAULT_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods", "csv"];

/// Every spreadsheet under `dir` (recursive), sorted by path.
///
/// Office lock files (`~$Report.xlsx`) and hidden files are skipped. A
/// missing directory yields an empty list; the caller decides whether that
/// is worth a warning.
pub fn discover_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, AdapterError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = format!("{}/**/*", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let entries = glob_with(&pattern, options).map_err(|e| AdapterError::Discovery {
        dir: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                log::warn!("skipping unreadable path: {e}");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        if name.starts_with("~$") || name.starts_with('.') {
            continue;
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Path relative to `root` with forward slashes, for stable document names
/// across platforms.
pub fn relative_label(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn finds_spreadsheets_recursively_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("week 2");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(dir.path().join("b.csv"), "x").unwrap();
        std::fs::write(dir.path().join("a.XLSX"), "x").unwrap();
        std::fs::write(sub.join("c.xlsx"), "x").unwrap();
        std::fs::write(dir.path().join("~$a.xlsx"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = discover_files(dir.path(), &exts()).unwrap();
        let labels: Vec<String> = files.iter().map(|p| relative_label(dir.path(), p)).collect();
        assert_eq!(labels, vec!["a.XLSX", "b.csv", "week 2/c.xlsx"]);
    }

    #[test]
    fn missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = discover_files(&dir.path().join("nope"), &exts()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn directory_with_glob_metacharacters() {
        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("reports [old]");
        std::fs::create_dir(&odd).unwrap();
        std::fs::write(odd.join("a.csv"), "x").unwrap();
        assert_eq!(discover_files(&odd, &exts()).unwrap().len(), 1);
    }
}
