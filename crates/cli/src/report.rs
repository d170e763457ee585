//! `sdiary dedupe | coverage | summary | extract | status`

use std::path::Path;

use serde::Serialize;
use sitediary_core::SourceKind;
use sitediary_recon::{dedup_report, find_gaps, run, CoverageGap, DuplicateCluster, ReconConfig};
use sitediary_store::{DailyTotal, IngestRun};

use crate::export::{
    ensure_out_dir, personnel_rows, write_csv, write_json, ActivityRow, DailyRow, DuplicateRow, EntryRow,
    ACTIVITY_HEADERS, DAILY_HEADERS, DUPLICATE_HEADERS, ENTRY_HEADERS, PERSONNEL_HEADERS,
};
use crate::{checked_root, CliError, Context};

fn recon_config(ctx: &Context, threshold: Option<f64>) -> Result<ReconConfig, CliError> {
    let mut config = ctx.settings.recon_config();
    if let Some(t) = threshold {
        config.dedup.fuzzy_threshold = t;
    }
    config
        .validate()
        .map_err(|e| CliError::usage(e.to_string()))?;
    Ok(config)
}

#[derive(Serialize)]
struct DuplicatesDocument<'a> {
    fuzzy_threshold: f64,
    entries: usize,
    clusters: &'a [DuplicateCluster],
}

pub fn cmd_dedupe(ctx: &Context, root: &Path, out: &Path, threshold: Option<f64>) -> Result<(), CliError> {
    let config = recon_config(ctx, threshold)?;
    let store = ctx.open_store(checked_root(root)?)?;
    let entries = store.entries()?;

    let report = dedup_report(&entries, &config);
    let members = report.member_rows(&entries);

    ensure_out_dir(out)?;
    write_csv(out, "duplicates.csv", DUPLICATE_HEADERS, members.iter().map(DuplicateRow::from))?;
    write_csv(out, "activities_unique.csv", ACTIVITY_HEADERS, report.activities.iter().map(ActivityRow::from))?;
    write_csv(out, "personnel_variants.csv", PERSONNEL_HEADERS, personnel_rows(&report.name_variants))?;
    write_json(
        out,
        "duplicates.json",
        &DuplicatesDocument {
            fuzzy_threshold: config.dedup.fuzzy_threshold,
            entries: entries.len(),
            clusters: &report.clusters,
        },
    )?;

    let cross = report.clusters.iter().filter(|c| c.cross_source).count();
    println!(
        "dedupe: {} cluster(s) ({} cross-source) covering {} of {} entries",
        report.clusters.len(),
        cross,
        members.len(),
        entries.len()
    );
    println!(
        "{} activity row(s), {} personnel name famil{}",
        report.activities.len(),
        report.name_variants.len(),
        if report.name_variants.len() == 1 { "y" } else { "ies" }
    );
    println!("written to {}", out.display());
    Ok(())
}

pub fn cmd_coverage(ctx: &Context, root: &Path, json: bool) -> Result<(), CliError> {
    let config = recon_config(ctx, None)?;
    let store = ctx.open_store(checked_root(root)?)?;
    let entries = store.entries()?;
    let gaps: Vec<CoverageGap> = find_gaps(&entries, &config.coverage);

    if json {
        let text = serde_json::to_string_pretty(&gaps).map_err(|e| CliError::io(format!("cannot serialize: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    if gaps.is_empty() {
        println!("coverage: no gaps");
    } else {
        println!("coverage: {} gap(s)", gaps.len());
        for g in &gaps {
            println!("  {g}");
        }
    }
    Ok(())
}

pub fn cmd_summary(ctx: &Context, root: &Path, out: &Path) -> Result<(), CliError> {
    let config = recon_config(ctx, None)?;
    let store = ctx.open_store(checked_root(root)?)?;
    let entries = store.entries()?;
    let result = run(&config, &entries).map_err(|e| CliError::usage(e.to_string()))?;

    ensure_out_dir(out)?;
    write_json(out, "daily_summary.json", &result)?;
    write_csv(out, "daily_summary.csv", DAILY_HEADERS, result.daily.iter().map(DailyRow::from))?;

    println!(
        "summary: {} day(s), {} entries, {} duplicate cluster(s), {} coverage gap(s)",
        result.daily.len(),
        result.summary.entries,
        result.summary.clusters,
        result.summary.coverage_gaps
    );
    println!("written to {}", out.display());
    Ok(())
}

pub fn cmd_extract(ctx: &Context, root: &Path, out: &Path) -> Result<(), CliError> {
    let store = ctx.open_store(checked_root(root)?)?;
    let entries = store.entries()?;

    ensure_out_dir(out)?;
    for kind in SourceKind::ALL {
        let rows = entries.iter().filter(|e| e.source_kind == kind).map(EntryRow::from);
        let path = write_csv(out, &format!("{kind}_entries.csv"), ENTRY_HEADERS, rows)?;
        println!("{}", path.display());
    }
    Ok(())
}

#[derive(Serialize)]
struct StatusDocument {
    entries: usize,
    last_reset_at: Option<String>,
    recent_runs: Vec<IngestRun>,
    daily_totals: Vec<DailyTotal>,
}

pub fn cmd_status(ctx: &Context, root: &Path, json: bool) -> Result<(), CliError> {
    let root = checked_root(root)?;
    let store = ctx.open_store(root)?;
    let status = StatusDocument {
        entries: store.entry_count()?,
        last_reset_at: store.meta("last_reset_at")?,
        recent_runs: store.recent_runs(5)?,
        daily_totals: store.daily_totals()?,
    };

    if json {
        let text =
            serde_json::to_string_pretty(&status).map_err(|e| CliError::io(format!("cannot serialize: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    println!("store: {}", ctx.database_path(root).display());
    println!("entries: {}", status.entries);
    println!("last reset: {}", status.last_reset_at.as_deref().unwrap_or("never"));
    for run in &status.recent_runs {
        println!(
            "  run {} {} at {}: {} inserted, {} unchanged, {} rejected",
            run.run_id, run.mode, run.started_at, run.entries_inserted, run.entries_unchanged, run.rejections
        );
    }
    for t in &status.daily_totals {
        println!("  {} {:<10} {:>4} entries {:>7.2} h", t.entry_date, t.source_kind, t.entries, t.minutes as f64 / 60.0);
    }
    Ok(())
}
