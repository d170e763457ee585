use std::path::PathBuf;

use sitediary_core::{DiaryEntry, SourceKind};
use sitediary_io::{AdapterOptions, SourceSpec};
use sitediary_recon::{run, MatchBasis, ReconConfig, ReconResult};
use sitediary_store::Store;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn ingest_site() -> Vec<DiaryEntry> {
    let sources = vec![
        SourceSpec::new(SourceKind::Client, "client"),
        SourceSpec::new(SourceKind::Supervisor, "supervisor"),
    ];
    let mut store = Store::open_in_memory().unwrap();
    let summary = store
        .reset_and_rebuild(&fixtures_dir().join("site"), &sources, &AdapterOptions::default())
        .unwrap();
    assert_eq!(summary.entries_inserted, 9);
    assert!(summary.rejections.is_empty());
    store.entries().unwrap()
}

fn load_and_run(config_toml: &str) -> (Vec<DiaryEntry>, ReconResult) {
    let config = ReconConfig::from_toml(config_toml).unwrap();
    let entries = ingest_site();
    let result = run(&config, &entries).unwrap();
    (entries, result)
}

fn persons(entries: &[DiaryEntry], ids: &[i64]) -> Vec<String> {
    ids.iter()
        .map(|id| entries.iter().find(|e| e.entry_id == *id).unwrap().person.clone())
        .collect()
}

// -------------------------------------------------------------------------
// Duplicates
// -------------------------------------------------------------------------

#[test]
fn default_config_finds_all_three_clusters() {
    let (entries, result) = load_and_run("");

    assert_eq!(result.summary.entries, 9);
    assert_eq!(result.summary.clusters, 3);
    assert_eq!(result.summary.cross_source_clusters, 2);

    let clusters = &result.dedup.clusters;
    let ids: Vec<&str> = clusters.iter().map(|c| c.cluster_id.as_str()).collect();
    assert_eq!(ids, vec!["dup-0001", "dup-0002", "dup-0003"]);

    // 2025-02-01: the resent client row, then the initials + wording match
    let resend = &clusters[0];
    assert_eq!(resend.match_basis, MatchBasis::Exact);
    assert_eq!(resend.confidence, 1.0);
    assert!(!resend.cross_source);
    assert_eq!(persons(&entries, &resend.members), vec!["jane roe", "jane roe"]);

    let inspection = &clusters[1];
    assert_eq!(inspection.match_basis, MatchBasis::Fuzzy);
    assert!(inspection.confidence >= 0.85 && inspection.confidence < 1.0);
    assert!(inspection.cross_source);
    let mut who = persons(&entries, &inspection.members);
    who.sort();
    assert_eq!(who, vec!["j. doe", "john doe"]);

    let pour = &clusters[2];
    assert_eq!(pour.entry_date.to_string(), "2025-02-04");
    assert_eq!(pour.match_basis, MatchBasis::Exact);
    assert!(pour.cross_source);
}

#[test]
fn strict_config_keeps_only_resubmissions() {
    let toml = std::fs::read_to_string(fixtures_dir().join("strict.recon.toml")).unwrap();
    let (_, result) = load_and_run(&toml);

    assert_eq!(result.meta.fuzzy_threshold, 0.95);
    assert_eq!(result.summary.clusters, 1);
    assert_eq!(result.dedup.clusters[0].match_basis, MatchBasis::Exact);
    assert!(result.dedup.name_variants.is_empty());
    assert!(result.gaps.is_empty());
}

#[test]
fn member_rows_annotate_every_member() {
    let (entries, result) = load_and_run("");
    let rows = result.dedup.member_rows(&entries);
    assert_eq!(rows.len(), result.dedup.duplicate_entries());
    assert_eq!(rows.len(), 6);

    let fuzzy: Vec<_> = rows.iter().filter(|r| r.match_basis == MatchBasis::Fuzzy).collect();
    assert_eq!(fuzzy.len(), 2);
    assert!(fuzzy.iter().any(|r| r.source_document == "supervisor/dsr.csv::dsr"));
    assert!(fuzzy.iter().all(|r| r.hours == 2.0));
}

// -------------------------------------------------------------------------
// Roll-ups + coverage
// -------------------------------------------------------------------------

#[test]
fn activity_rollup_reports_missing_copies() {
    let (_, result) = load_and_run("");
    let survey = result
        .dedup
        .activities
        .iter()
        .find(|a| a.activity_text == "Survey set-out")
        .unwrap();
    assert_eq!(survey.copies_for_date, 3);
    assert_eq!(survey.sources_present.len(), 2);
    assert_eq!(survey.sources_missing, vec!["supervisor/dsr.csv::dsr".to_string()]);
    assert!(survey.status.starts_with("in 2/3 copies"));
    assert!(!survey.unique_to_source);

    let excavation: Vec<_> = result
        .dedup
        .activities
        .iter()
        .filter(|a| a.activity_text == "Excavation")
        .collect();
    assert_eq!(excavation.len(), 2);
    assert!(excavation[0].unique_to_source);
    assert_eq!(
        excavation[0].status,
        "single instance in supervisor/dsr.csv::dsr - missing from: client/feb.csv::feb"
    );
    assert_eq!(excavation[1].status, "only available copy");
}

#[test]
fn name_variants_group_initials() {
    let (_, result) = load_and_run("");
    assert_eq!(result.dedup.name_variants.len(), 1);
    let family = &result.dedup.name_variants[0];
    assert_eq!(family.canonical, "john doe");
    assert_eq!(family.variants.len(), 2);
    assert_eq!(family.total_entries, 5);
}

#[test]
fn coverage_and_daily_summary() {
    let (_, result) = load_and_run("");
    assert_eq!(result.gaps.len(), 1);
    assert_eq!(result.gaps[0].date.to_string(), "2025-02-03");
    assert_eq!(result.gaps[0].source_kind, SourceKind::Client);

    assert_eq!(result.daily.len(), 4);
    let first = &result.daily[0];
    assert_eq!(first.client_entries, 3);
    assert_eq!(first.client_hours, 9.0);
    assert_eq!(first.supervisor_entries, 1);
    assert_eq!(first.duplicate_clusters, 2);
    assert!(first.missing.is_empty());
    assert_eq!(result.daily[2].missing, vec![SourceKind::Client]);
}

#[test]
fn result_serializes_for_export() {
    let (_, result) = load_and_run("");
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["dedup"]["clusters"][1]["match_basis"], "fuzzy");
    assert_eq!(json["gaps"][0]["source_kind"], "client");
    assert_eq!(json["summary"]["basis_counts"]["exact"], 2);
    assert!(json["meta"]["engine_version"].is_string());
}
