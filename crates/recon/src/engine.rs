use sitediary_core::DiaryEntry;

use crate::config::ReconConfig;
use crate::coverage::find_gaps;
use crate::dedup::find_duplicates;
use crate::error::ReconError;
use crate::evidence::{compute_summary, daily_summaries};
use crate::model::{DedupReport, ReconMeta, ReconResult};
use crate::rollup::{activity_rollups, name_variant_rollups};

/// Clusters plus the activity and personnel roll-ups.
pub fn dedup_report(entries: &[DiaryEntry], config: &ReconConfig) -> DedupReport {
    DedupReport {
        clusters: find_duplicates(entries, &config.dedup),
        activities: activity_rollups(entries),
        name_variants: name_variant_rollups(entries, &config.dedup),
    }
}

/// Run one full analysis pass over the current entry set. Everything is
/// derived fresh; nothing is carried over from earlier runs.
pub fn run(config: &ReconConfig, entries: &[DiaryEntry]) -> Result<ReconResult, ReconError> {
    config.validate()?;

    let dedup = dedup_report(entries, config);
    let gaps = find_gaps(entries, &config.coverage);
    let daily = daily_summaries(entries, &dedup, &gaps);
    let summary = compute_summary(entries, &dedup, &gaps);

    Ok(ReconResult {
        meta: ReconMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            fuzzy_threshold: config.dedup.fuzzy_threshold,
        },
        summary,
        dedup,
        gaps,
        daily,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DedupConfig;
    use crate::test_support::entry;
    use sitediary_core::SourceKind;

    #[test]
    fn invalid_config_is_rejected() {
        let config = ReconConfig { dedup: DedupConfig::with_threshold(-0.1), ..Default::default() };
        assert!(matches!(run(&config, &[]), Err(ReconError::ConfigValidation(_))));
    }

    #[test]
    fn empty_store_gives_empty_result() {
        let result = run(&ReconConfig::default(), &[]).unwrap();
        assert_eq!(result.summary.entries, 0);
        assert!(result.dedup.clusters.is_empty());
        assert!(result.gaps.is_empty());
        assert!(result.daily.is_empty());
        assert_eq!(result.meta.fuzzy_threshold, 0.85);
    }

    #[test]
    fn full_pass() {
        let entries = vec![
            entry(1, SourceKind::Supervisor, "2025-02-01", "j. doe", "Site inspection", 120),
            entry(2, SourceKind::Client, "2025-02-01", "john doe", "Site inspection visit", 120),
            entry(3, SourceKind::Client, "2025-02-02", "john doe", "Pour slab", 60),
        ];
        let result = run(&ReconConfig::default(), &entries).unwrap();
        assert_eq!(result.summary.clusters, 1);
        assert_eq!(result.gaps.len(), 1);
        assert_eq!(result.daily.len(), 2);
        assert_eq!(result.daily[1].missing, vec![SourceKind::Supervisor]);
        assert_eq!(result.dedup.name_variants.len(), 1);

        let rows = result.dedup.member_rows(&entries);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cluster_id, "dup-0001");
        assert_eq!(rows[1].hours, 2.0);
    }
}
