use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use sitediary_core::{DiaryEntry, SourceKind};

// ---------------------------------------------------------------------------
// Exact-resubmission units
// ---------------------------------------------------------------------------

/// Key shared by every entry in one exact-resubmission unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitKey {
    pub entry_date: NaiveDate,
    pub source_kind: SourceKind,
    pub person: String,
    pub activity_key: String,
    pub duration_minutes: i64,
}

/// Entries of one kind that are identical after normalization. A unit with
/// a single member is just that entry.
#[derive(Debug, Clone, Serialize)]
pub struct ExactUnit {
    pub source_kind: SourceKind,
    pub entry_date: NaiveDate,
    pub person: String,
    /// Lower-cased normalized activity text.
    pub activity_key: String,
    pub duration_minutes: i64,
    /// Ascending entry ids.
    pub members: Vec<i64>,
}

impl ExactUnit {
    pub fn first_id(&self) -> i64 {
        self.members[0]
    }

    pub fn is_resubmission(&self) -> bool {
        self.members.len() > 1
    }
}

// ---------------------------------------------------------------------------
// Cross-source links
// ---------------------------------------------------------------------------

/// A candidate pairing of a client unit with a supervisor unit on the same
/// date. Indices point into the unit list the link was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossLink {
    pub client: usize,
    pub supervisor: usize,
    pub score: f64,
}

impl CrossLink {
    pub fn is_exact(&self) -> bool {
        self.score >= 1.0
    }
}

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBasis {
    Exact,
    Fuzzy,
    /// Exact resubmissions on at least one side, joined by a fuzzy text match.
    Both,
}

impl fmt::Display for MatchBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// Two or more entries judged to record one real-world event. Recomputed on
/// every run; never stored.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateCluster {
    pub cluster_id: String,
    pub entry_date: NaiveDate,
    pub person: String,
    pub members: Vec<i64>,
    pub match_basis: MatchBasis,
    pub confidence: f64,
    pub cross_source: bool,
}

impl DuplicateCluster {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, entry_id: i64) -> bool {
        self.members.binary_search(&entry_id).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Roll-ups
// ---------------------------------------------------------------------------

/// One normalized activity on one date, with the sheets that do and do not
/// report it.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRollup {
    pub entry_date: NaiveDate,
    pub activity_text: String,
    pub sources_present: Vec<String>,
    pub sources_missing: Vec<String>,
    pub status: String,
    pub unique_to_source: bool,
    pub copies_for_date: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NameVariant {
    pub person: String,
    pub entries: usize,
    pub kinds: Vec<SourceKind>,
}

/// Spellings that `names_compatible` treats as one person.
#[derive(Debug, Clone, Serialize)]
pub struct NameVariantRollup {
    /// The variant with the most entries (ties: longest, then alphabetical).
    pub canonical: String,
    pub total_entries: usize,
    pub variants: Vec<NameVariant>,
}

// ---------------------------------------------------------------------------
// Dedup report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupReport {
    pub clusters: Vec<DuplicateCluster>,
    pub activities: Vec<ActivityRollup>,
    pub name_variants: Vec<NameVariantRollup>,
}

/// One cluster member, flattened for tabular export.
#[derive(Debug, Clone, Serialize)]
pub struct MemberRow {
    pub cluster_id: String,
    pub entry_id: i64,
    pub source_kind: SourceKind,
    pub source_document: String,
    pub row_index: u32,
    pub entry_date: NaiveDate,
    pub person: String,
    pub activity_text: String,
    pub hours: f64,
    pub match_basis: MatchBasis,
    pub confidence: f64,
    pub cross_source: bool,
}

impl DedupReport {
    /// Entries that are not in `entries` are skipped.
    pub fn member_rows(&self, entries: &[DiaryEntry]) -> Vec<MemberRow> {
        let by_id: HashMap<i64, &DiaryEntry> = entries.iter().map(|e| (e.entry_id, e)).collect();
        let mut rows = Vec::new();
        for cluster in &self.clusters {
            for id in &cluster.members {
                let Some(entry) = by_id.get(id) else {
                    log::warn!("{}: entry {id} not in the supplied entry set", cluster.cluster_id);
                    continue;
                };
                rows.push(MemberRow {
                    cluster_id: cluster.cluster_id.clone(),
                    entry_id: entry.entry_id,
                    source_kind: entry.source_kind,
                    source_document: entry.source_document.clone(),
                    row_index: entry.row_index,
                    entry_date: entry.entry_date,
                    person: entry.person.clone(),
                    activity_text: entry.activity_text.clone(),
                    hours: entry.hours(),
                    match_basis: cluster.match_basis,
                    confidence: cluster.confidence,
                    cross_source: cluster.cross_source,
                });
            }
        }
        rows
    }

    pub fn duplicate_entries(&self) -> usize {
        self.clusters.iter().map(DuplicateCluster::size).sum()
    }
}

// ---------------------------------------------------------------------------
// Coverage + daily summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CoverageGap {
    pub date: NaiveDate,
    pub source_kind: SourceKind,
}

impl fmt::Display for CoverageGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: no {} entries", self.date, self.source_kind)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub client_entries: usize,
    pub client_hours: f64,
    pub supervisor_entries: usize,
    pub supervisor_hours: f64,
    pub duplicate_clusters: usize,
    pub missing: Vec<SourceKind>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconSummary {
    pub entries: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub clusters: usize,
    pub cross_source_clusters: usize,
    pub duplicate_entries: usize,
    pub basis_counts: BTreeMap<String, usize>,
    pub coverage_gaps: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
    pub fuzzy_threshold: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub dedup: DedupReport,
    pub gaps: Vec<CoverageGap>,
    pub daily: Vec<DailySummary>,
}
