// Per-date activity presence and personnel spelling families

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use sitediary_core::normalize::{comparison_key, names_compatible};
use sitediary_core::{DiaryEntry, SourceKind};

use crate::config::DedupConfig;
use crate::model::{ActivityRollup, NameVariant, NameVariantRollup};

/// One row per (date, normalized activity): which sheets reporting that date
/// carry it and which do not.
pub fn activity_rollups(entries: &[DiaryEntry]) -> Vec<ActivityRollup> {
    let mut sources_by_date: BTreeMap<NaiveDate, BTreeSet<&str>> = BTreeMap::new();
    let mut groups: BTreeMap<(NaiveDate, String), Vec<&DiaryEntry>> = BTreeMap::new();

    for entry in entries {
        sources_by_date
            .entry(entry.entry_date)
            .or_default()
            .insert(&entry.source_document);
        groups
            .entry((entry.entry_date, comparison_key(&entry.activity_text)))
            .or_default()
            .push(entry);
    }

    let mut rollups: Vec<ActivityRollup> = groups
        .into_iter()
        .filter_map(|((date, _), items)| {
            let canonical = items.iter().min_by_key(|e| e.entry_id)?;
            let all = sources_by_date.get(&date)?;
            let present: BTreeSet<&str> = items.iter().map(|e| e.source_document.as_str()).collect();
            let missing: Vec<String> = all.difference(&present).map(|s| s.to_string()).collect();
            let present: Vec<String> = present.into_iter().map(String::from).collect();
            let (status, unique_to_source) = describe_presence(&present, &missing, all.len());
            Some(ActivityRollup {
                entry_date: date,
                activity_text: canonical.activity_text.clone(),
                sources_present: present,
                sources_missing: missing,
                status,
                unique_to_source,
                copies_for_date: all.len(),
            })
        })
        .collect();

    rollups.sort_by(|a, b| {
        a.entry_date
            .cmp(&b.entry_date)
            .then_with(|| a.activity_text.cmp(&b.activity_text))
    });
    rollups
}

/// Human-readable presence status plus whether the item exists in exactly
/// one of several copies.
pub fn describe_presence(present: &[String], missing: &[String], total: usize) -> (String, bool) {
    if total <= 1 {
        return ("only available copy".to_string(), false);
    }
    if present.len() == total {
        return (format!("present in all {total} copies"), false);
    }
    let missing_note = missing.join(", ");
    if present.len() == 1 {
        let suffix = if missing_note.is_empty() {
            String::new()
        } else {
            format!(" - missing from: {missing_note}")
        };
        return (format!("single instance in {}{suffix}", present[0]), true);
    }
    let suffix = if missing_note.is_empty() {
        String::new()
    } else {
        format!("; missing from: {missing_note}")
    };
    (
        format!("in {}/{total} copies ({}){suffix}", present.len(), present.join(", ")),
        false,
    )
}

/// Families of distinct person spellings that refer to one person. Only
/// families with more than one spelling are reported.
///
/// Every pair of spellings in a family is compatible. Names are placed in
/// canonical order (most entries, then longest, then alphabetical), so the
/// first name of a family is its canonical form. A spelling compatible with
/// more than one family ("j. doe" beside "john doe" and "jane doe") is
/// ambiguous and joins none of them.
pub fn name_variant_rollups(entries: &[DiaryEntry], config: &DedupConfig) -> Vec<NameVariantRollup> {
    let mut counts: BTreeMap<&str, (usize, BTreeSet<SourceKind>)> = BTreeMap::new();
    for entry in entries.iter().filter(|e| !e.person.is_empty()) {
        let slot = counts.entry(&entry.person).or_default();
        slot.0 += 1;
        slot.1.insert(entry.source_kind);
    }

    let mut names: Vec<&str> = counts.keys().copied().collect();
    names.sort_by(|a, b| {
        counts[b]
            .0
            .cmp(&counts[a].0)
            .then(b.len().cmp(&a.len()))
            .then(a.cmp(b))
    });

    let mut families: Vec<Vec<&str>> = Vec::new();
    for name in names {
        let fits: Vec<usize> = families
            .iter()
            .enumerate()
            .filter(|(_, family)| {
                family
                    .iter()
                    .all(|member| names_compatible(member, name, config.compare_person_initials))
            })
            .map(|(i, _)| i)
            .collect();
        match fits.as_slice() {
            [only] => families[*only].push(name),
            [] => families.push(vec![name]),
            _ => {
                log::debug!("name variants: '{name}' fits {} families, left alone", fits.len());
                families.push(vec![name]);
            }
        }
    }

    let mut rollups: Vec<NameVariantRollup> = families
        .into_iter()
        .filter(|members| members.len() > 1)
        .map(|members| {
            let canonical = members[0].to_string();
            let mut variants: Vec<NameVariant> = members
                .iter()
                .map(|&name| {
                    let (entries, kinds) = &counts[name];
                    NameVariant {
                        person: name.to_string(),
                        entries: *entries,
                        kinds: kinds.iter().copied().collect(),
                    }
                })
                .collect();
            variants.sort_by(|a, b| a.person.cmp(&b.person));
            NameVariantRollup {
                canonical,
                total_entries: variants.iter().map(|v| v.entries).sum(),
                variants,
            }
        })
        .collect();

    rollups.sort_by(|a, b| a.canonical.cmp(&b.canonical));
    rollups
}
