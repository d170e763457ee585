use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use sitediary_core::normalize::{comparison_key, names_compatible};
use sitediary_core::SourceKind;

use crate::config::DedupConfig;
use crate::model::{CrossLink, ExactUnit};

/// Activity-text similarity in `0.0..=1.0`. Texts equal after normalization
/// score exactly 1.0; anything else is Jaro-Winkler over the comparison keys.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (comparison_key(a), comparison_key(b));
    if a == b {
        1.0
    } else {
        strsim::jaro_winkler(&a, &b)
    }
}

/// Whether two units plausibly come from the same person. Unattributed
/// entries never correlate across sources.
fn same_person(a: &ExactUnit, b: &ExactUnit, config: &DedupConfig) -> bool {
    !a.person.is_empty()
        && !b.person.is_empty()
        && names_compatible(&a.person, &b.person, config.compare_person_initials)
}

/// Every client/supervisor unit pair on the same date, for compatible
/// persons, whose similarity is at or above the threshold.
///
/// Sorted strongest first; ties go to the earlier date, then the lower
/// entry ids.
pub fn cross_source_links(units: &[ExactUnit], config: &DedupConfig) -> Vec<CrossLink> {
    let mut by_date: BTreeMap<NaiveDate, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
    for (i, unit) in units.iter().enumerate() {
        let slot = by_date.entry(unit.entry_date).or_default();
        match unit.source_kind {
            SourceKind::Client => slot.0.push(i),
            SourceKind::Supervisor => slot.1.push(i),
        }
    }

    let mut links = Vec::new();
    for (clients, supervisors) in by_date.values() {
        for &ci in clients {
            for &si in supervisors {
                let (c, s) = (&units[ci], &units[si]);
                if !same_person(c, s, config) {
                    continue;
                }
                let score = similarity(&c.activity_key, &s.activity_key);
                if score >= config.fuzzy_threshold {
                    links.push(CrossLink { client: ci, supervisor: si, score });
                }
            }
        }
    }

    links.sort_by(|a, b| compare_links(a, b, units));
    log::debug!("dedup: {} cross-source link(s) at threshold {}", links.len(), config.fuzzy_threshold);
    links
}

fn compare_links(a: &CrossLink, b: &CrossLink, units: &[ExactUnit]) -> Ordering {
    let first = |l: &CrossLink| units[l.client].first_id().min(units[l.supervisor].first_id());
    let second = |l: &CrossLink| units[l.client].first_id().max(units[l.supervisor].first_id());
    b.score
        .total_cmp(&a.score)
        .then_with(|| units[a.client].entry_date.cmp(&units[b.client].entry_date))
        .then_with(|| first(a).cmp(&first(b)))
        .then_with(|| second(a).cmp(&second(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::exact_units;
    use crate::test_support::entry;

    #[test]
    fn exact_text_scores_one() {
        assert_eq!(similarity("Site  Inspection", "site inspection"), 1.0);
        let s = similarity("Site inspection", "Site inspection visit");
        assert!(s > 0.85 && s < 1.0, "{s}");
        assert!(similarity("Pour slab", "Erect scaffold") < 0.85);
    }

    #[test]
    fn links_need_same_date_and_person() {
        let entries = vec![
            entry(1, SourceKind::Supervisor, "2025-02-01", "j. doe", "Site inspection", 120),
            entry(2, SourceKind::Client, "2025-02-01", "john doe", "Site inspection", 120),
            entry(3, SourceKind::Client, "2025-02-02", "john doe", "Site inspection", 120),
            entry(4, SourceKind::Client, "2025-02-01", "jane roe", "Site inspection", 120),
        ];
        let units = exact_units(&entries);
        let links = cross_source_links(&units, &DedupConfig::default());
        assert_eq!(links.len(), 1);
        assert_eq!(units[links[0].client].members, vec![2]);
        assert_eq!(units[links[0].supervisor].members, vec![1]);
        assert!(links[0].is_exact());

        let strict = DedupConfig { compare_person_initials: false, ..DedupConfig::default() };
        assert!(cross_source_links(&units, &strict).is_empty());
    }

    #[test]
    fn unattributed_entries_never_link() {
        let entries = vec![
            entry(1, SourceKind::Supervisor, "2025-02-01", "", "Site inspection", 0),
            entry(2, SourceKind::Client, "2025-02-01", "", "Site inspection", 0),
        ];
        let units = exact_units(&entries);
        assert!(cross_source_links(&units, &DedupConfig::default()).is_empty());
    }

    #[test]
    fn links_sorted_by_score_then_ids() {
        let entries = vec![
            entry(1, SourceKind::Client, "2025-02-01", "john doe", "Site inspection visit", 60),
            entry(2, SourceKind::Client, "2025-02-01", "john doe", "Site inspection", 60),
            entry(3, SourceKind::Supervisor, "2025-02-01", "john doe", "Site inspection", 60),
        ];
        let units = exact_units(&entries);
        let links = cross_source_links(&units, &DedupConfig::default());
        assert_eq!(links.len(), 2);
        assert!(links[0].is_exact());
        assert_eq!(units[links[0].client].members, vec![2]);
        assert!(links[1].score < 1.0);
    }
}
