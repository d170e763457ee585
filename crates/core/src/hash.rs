use sha2::{Digest, Sha256};

use crate::normalize::normalize_text;

const CELL_SEP: &[u8] = b"\x1f";
const CONTEXT_SEP: &[u8] = b"\x1e";

/// SHA-256 of a source row → "sha256:<64 hex>".
///
/// Cells are whitespace-normalized and trailing empty cells dropped, so a
/// widened used-range or re-spaced cell hashes the same. `context` carries
/// values the row inherits from elsewhere in the sheet (sheet-level date,
/// filled-down merged cells); they are part of the row's identity.
pub fn row_hash(cells: &[String], context: &[(&str, &str)]) -> String {
    let normalized: Vec<String> = cells.iter().map(|c| normalize_text(c)).collect();
    let used = normalized
        .iter()
        .rposition(|c| !c.is_empty())
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut hasher = Sha256::new();
    for (i, cell) in normalized[..used].iter().enumerate() {
        if i > 0 {
            hasher.update(CELL_SEP);
        }
        hasher.update(cell.as_bytes());
    }
    for (key, value) in context {
        hasher.update(CONTEXT_SEP);
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(normalize_text(value).as_bytes());
    }
    let result = hasher.finalize();
    format!("sha256:{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn stable_for_identical_rows() {
        let a = row_hash(&cells(&["2025-02-01", "J. Doe", "Site inspection", "2"]), &[]);
        let b = row_hash(&cells(&["2025-02-01", "J. Doe", "Site inspection", "2"]), &[]);
        assert_eq!(a, b);
        assert!(a.starts_with("sha256:"));
        assert_eq!(a.len(), "sha256:".len() + 64);
    }

    #[test]
    fn whitespace_only_changes_ignored() {
        let a = row_hash(&cells(&["2025-02-01", "J. Doe", "Site inspection", "2"]), &[]);
        let b = row_hash(&cells(&["2025-02-01 ", "J.  Doe", " Site inspection", "2", "", ""]), &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn content_changes_change_hash() {
        let a = row_hash(&cells(&["2025-02-01", "J. Doe", "Site inspection", "2"]), &[]);
        let b = row_hash(&cells(&["2025-02-01", "J. Doe", "Site inspection", "3"]), &[]);
        let c = row_hash(&cells(&["2025-02-01", "J. Doe", "site inspection", "2"]), &[]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn cell_boundaries_matter() {
        let a = row_hash(&cells(&["ab", "c"]), &[]);
        let b = row_hash(&cells(&["a", "bc"]), &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn context_is_part_of_identity() {
        let row = cells(&["Worker One", "8", "Trenching"]);
        let a = row_hash(&row, &[("sheet_date", "2025-10-03")]);
        let b = row_hash(&row, &[("sheet_date", "2025-10-04")]);
        assert_ne!(a, b);
    }
}
