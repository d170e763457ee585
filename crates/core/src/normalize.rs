//! Text, personnel-name and duration normalization.

use std::collections::BTreeMap;

use crate::error::NormalizeError;

/// Trim, turn NBSP into space, collapse whitespace runs.
pub fn normalize_text(value: &str) -> String {
    value
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lower-cased [`normalize_text`]. Used wherever two texts are compared.
pub fn comparison_key(value: &str) -> String {
    normalize_text(value).to_lowercase()
}

// ---------------------------------------------------------------------------
// Personnel names
// ---------------------------------------------------------------------------

/// Known spelling variants mapped onto one canonical (normalized) name.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    map: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys and values are stored in normalized form, so lookups are
    /// insensitive to case, punctuation noise and spacing.
    pub fn insert(&mut self, variant: &str, canonical: &str) {
        self.map.insert(fold_person(variant), fold_person(canonical));
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn resolve<'a>(&'a self, folded: &'a str) -> &'a str {
        self.map.get(folded).map(String::as_str).unwrap_or(folded)
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for AliasTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = AliasTable::new();
        for (k, v) in iter {
            table.insert(k.as_ref(), v.as_ref());
        }
        table
    }
}

fn fold_person(raw: &str) -> String {
    let kept: String = normalize_text(raw)
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '\'' {
                c
            } else {
                ' '
            }
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a personnel name and apply the alias table.
pub fn normalize_person(raw: &str, aliases: &AliasTable) -> String {
    let folded = fold_person(raw);
    aliases.resolve(&folded).to_string()
}

/// Whether two normalized names plausibly denote the same person.
///
/// Equal names always match. With `allow_initials`, names match when the
/// surnames agree and each given-name token equals, or is the initial of,
/// the corresponding token on the other side ("j. doe" ~ "john doe").
pub fn names_compatible(a: &str, b: &str, allow_initials: bool) -> bool {
    if a == b {
        return true;
    }
    if !allow_initials {
        return false;
    }
    let ta: Vec<&str> = a.split_whitespace().collect();
    let tb: Vec<&str> = b.split_whitespace().collect();
    if ta.len() < 2 || ta.len() != tb.len() {
        return false;
    }
    let (Some((sa, given_a)), Some((sb, given_b))) = (ta.split_last(), tb.split_last()) else {
        return false;
    };
    if sa != sb {
        return false;
    }
    given_a
        .iter()
        .zip(given_b.iter())
        .all(|(x, y)| given_token_compatible(x, y))
}

fn given_token_compatible(x: &str, y: &str) -> bool {
    let x = x.trim_end_matches('.');
    let y = y.trim_end_matches('.');
    if x == y {
        return true;
    }
    let initial = |s: &str| s.chars().next();
    match (x.chars().count(), y.chars().count()) {
        (1, _) => initial(y) == initial(x),
        (_, 1) => initial(x) == initial(y),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Durations
// ---------------------------------------------------------------------------

/// Longest duration one row may carry. Larger values are typos, and the
/// bound keeps per-day and per-store sums far from `i64` overflow.
pub const MAX_DURATION_MINUTES: i64 = 100_000 * 60;

/// Hours given as a number → whole minutes.
pub fn minutes_from_hours(hours: f64) -> Result<i64, NormalizeError> {
    if !hours.is_finite() {
        return Err(NormalizeError::Duration(hours.to_string()));
    }
    if hours < 0.0 {
        return Err(NormalizeError::NegativeDuration(hours.to_string()));
    }
    let minutes = (hours * 60.0).round();
    if minutes > MAX_DURATION_MINUTES as f64 {
        return Err(NormalizeError::Duration(hours.to_string()));
    }
    Ok(minutes as i64)
}

/// Parse a duration cell into whole minutes.
///
/// Bare numbers are hours. Accepts `2h`, `2.5 hrs`, `90 min`, `1:30`, `2,5`.
/// An empty cell is zero.
pub fn parse_duration_minutes(value: &str) -> Result<i64, NormalizeError> {
    let cleaned = comparison_key(value);
    if cleaned.is_empty() {
        return Ok(0);
    }

    if let Some((h, m)) = cleaned.split_once(':') {
        let hours: i64 = h.trim().parse().map_err(|_| NormalizeError::Duration(value.into()))?;
        let mins: i64 = m.trim().parse().map_err(|_| NormalizeError::Duration(value.into()))?;
        if hours < 0 || !(0..60).contains(&mins) {
            return Err(NormalizeError::Duration(value.into()));
        }
        return hours
            .checked_mul(60)
            .and_then(|m| m.checked_add(mins))
            .filter(|m| *m <= MAX_DURATION_MINUTES)
            .ok_or_else(|| NormalizeError::Duration(value.into()));
    }

    let split_at = cleaned
        .find(|c: char| c.is_alphabetic())
        .unwrap_or(cleaned.len());
    let (number, unit) = cleaned.split_at(split_at);
    let number = number.trim().replace(',', ".");
    let amount: f64 = number
        .parse()
        .map_err(|_| NormalizeError::Duration(value.into()))?;

    match unit.trim() {
        "" | "h" | "hr" | "hrs" | "hour" | "hours" => minutes_from_hours(amount)
            .map_err(|e| match e {
                NormalizeError::NegativeDuration(_) => NormalizeError::NegativeDuration(value.into()),
                _ => NormalizeError::Duration(value.into()),
            }),
        "m" | "min" | "mins" | "minute" | "minutes" => {
            if amount < 0.0 {
                Err(NormalizeError::NegativeDuration(value.into()))
            } else if amount.round() > MAX_DURATION_MINUTES as f64 {
                Err(NormalizeError::Duration(value.into()))
            } else {
                Ok(amount.round() as i64)
            }
        }
        _ => Err(NormalizeError::Duration(value.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_whitespace_collapsed() {
        assert_eq!(normalize_text("  Site \u{a0} inspection\n visit "), "Site inspection visit");
        assert_eq!(comparison_key("Site  INSPECTION"), "site inspection");
    }

    #[test]
    fn person_folding_and_aliases() {
        let none = AliasTable::new();
        assert_eq!(normalize_person("  John   DOE ", &none), "john doe");
        assert_eq!(normalize_person("J. Doe", &none), "j. doe");
        assert_eq!(normalize_person("O'Brien, Pat", &none), "o'brien pat");

        let aliases: AliasTable = [("Johnny Doe", "John Doe")].into_iter().collect();
        assert_eq!(normalize_person("johnny  doe", &aliases), "john doe");
        assert_eq!(aliases.len(), 1);
    }

    #[test]
    fn initials_compatible() {
        assert!(names_compatible("j. doe", "john doe", true));
        assert!(names_compatible("john doe", "j doe", true));
        assert!(!names_compatible("j. doe", "john doe", false));
        assert!(!names_compatible("j. smith", "john doe", true));
        assert!(!names_compatible("jane doe", "john doe", true));
        assert!(!names_compatible("doe", "john doe", true));
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration_minutes("2").unwrap(), 120);
        assert_eq!(parse_duration_minutes("2.0h").unwrap(), 120);
        assert_eq!(parse_duration_minutes("2,5 hrs").unwrap(), 150);
        assert_eq!(parse_duration_minutes("90 min").unwrap(), 90);
        assert_eq!(parse_duration_minutes("1:30").unwrap(), 90);
        assert_eq!(parse_duration_minutes("").unwrap(), 0);
        assert!(matches!(parse_duration_minutes("all day"), Err(NormalizeError::Duration(_))));
        assert!(matches!(parse_duration_minutes("-2"), Err(NormalizeError::NegativeDuration(_))));
        assert!(parse_duration_minutes("3 parsecs").is_err());
    }

    #[test]
    fn oversized_durations_are_rejected_not_wrapped() {
        for text in ["999999999999999999:00", "9223372036854775807:59", "99999999999999999999", "9999999999 min", "200000 hrs"] {
            assert!(
                matches!(parse_duration_minutes(text), Err(NormalizeError::Duration(_))),
                "{text} accepted"
            );
        }
        assert_eq!(parse_duration_minutes("100000:00").unwrap(), MAX_DURATION_MINUTES);
    }

    #[test]
    fn minutes_from_numeric_hours() {
        assert_eq!(minutes_from_hours(7.25).unwrap(), 435);
        assert!(minutes_from_hours(-1.0).is_err());
    }
}
