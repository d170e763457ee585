use sitediary_core::DiaryEntry;

use crate::aggregate::exact_units;
use crate::config::DedupConfig;
use crate::matcher::cross_source_links;
use crate::model::{DuplicateCluster, ExactUnit, MatchBasis};

/// A cluster before ids are assigned.
struct Draft<'a> {
    units: Vec<&'a ExactUnit>,
    basis: MatchBasis,
    confidence: f64,
}

/// Find every duplicate cluster in `entries`.
///
/// Identical entries of one kind always share a unit. Units are then paired
/// across sources strongest link first; a unit joins at most one pairing and
/// formed clusters are never merged. A resubmission group only takes an exact
/// partner, so its cluster keeps confidence 1.0. Unpaired units with more than
/// one member become exact-resubmission clusters.
pub fn find_duplicates(entries: &[DiaryEntry], config: &DedupConfig) -> Vec<DuplicateCluster> {
    let units = exact_units(entries);
    let links = cross_source_links(&units, config);

    let mut assigned = vec![false; units.len()];
    let mut drafts: Vec<Draft<'_>> = Vec::new();

    for link in &links {
        if assigned[link.client] || assigned[link.supervisor] {
            continue;
        }
        let (c, s) = (&units[link.client], &units[link.supervisor]);
        let resubmitted = c.is_resubmission() || s.is_resubmission();
        if resubmitted && !link.is_exact() {
            continue;
        }
        assigned[link.client] = true;
        assigned[link.supervisor] = true;

        let basis = match (link.is_exact(), resubmitted) {
            (true, true) => MatchBasis::Both,
            (true, false) => MatchBasis::Exact,
            (false, _) => MatchBasis::Fuzzy,
        };
        drafts.push(Draft { units: vec![c, s], basis, confidence: link.score });
    }

    for (i, unit) in units.iter().enumerate() {
        if !assigned[i] && unit.is_resubmission() {
            drafts.push(Draft { units: vec![unit], basis: MatchBasis::Exact, confidence: 1.0 });
        }
    }

    let mut clusters: Vec<DuplicateCluster> = drafts.into_iter().map(into_cluster).collect();
    clusters.sort_by(|a, b| a.entry_date.cmp(&b.entry_date).then(a.members[0].cmp(&b.members[0])));
    for (i, cluster) in clusters.iter_mut().enumerate() {
        cluster.cluster_id = format!("dup-{:04}", i + 1);
    }

    log::info!(
        "dedup: {} cluster(s) from {} entries ({} units)",
        clusters.len(),
        entries.len(),
        units.len()
    );
    clusters
}

fn into_cluster(draft: Draft<'_>) -> DuplicateCluster {
    let mut members: Vec<i64> = draft.units.iter().flat_map(|u| u.members.iter().copied()).collect();
    members.sort_unstable();

    // Person and date come from the unit holding the lowest entry id.
    let lead = draft
        .units
        .iter()
        .min_by_key(|u| u.first_id())
        .copied()
        .unwrap_or(draft.units[0]);
    let cross_source = draft.units.windows(2).any(|w| w[0].source_kind != w[1].source_kind);

    DuplicateCluster {
        cluster_id: String::new(),
        entry_date: lead.entry_date,
        person: lead.person.clone(),
        members,
        match_basis: draft.basis,
        confidence: draft.confidence,
        cross_source,
    }
}
