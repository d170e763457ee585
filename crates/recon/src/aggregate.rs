use std::collections::BTreeMap;

use sitediary_core::normalize::comparison_key;
use sitediary_core::DiaryEntry;

use crate::model::{ExactUnit, UnitKey};

/// Group entries by (date, kind, person, normalized activity, duration).
/// Output is ordered by that key; members are ascending by id.
pub fn exact_units(entries: &[DiaryEntry]) -> Vec<ExactUnit> {
    let mut groups: BTreeMap<UnitKey, Vec<i64>> = BTreeMap::new();

    for entry in entries {
        let key = UnitKey {
            entry_date: entry.entry_date,
            source_kind: entry.source_kind,
            person: entry.person.clone(),
            activity_key: comparison_key(&entry.activity_text),
            duration_minutes: entry.duration_minutes,
        };
        groups.entry(key).or_default().push(entry.entry_id);
    }

    groups
        .into_iter()
        .map(|(key, mut members)| {
            members.sort_unstable();
            ExactUnit {
                source_kind: key.source_kind,
                entry_date: key.entry_date,
                person: key.person,
                activity_key: key.activity_key,
                duration_minutes: key.duration_minutes,
                members,
            }
        })
        .collect()
}
