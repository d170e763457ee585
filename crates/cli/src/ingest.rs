//! `sdiary rebuild | refresh | validate`

use std::path::Path;

use sitediary_store::{IngestSummary, ValidationReport};

use crate::exit_codes::EXIT_DIVERGENCE;
use crate::{checked_root, CliError, Context};

/// How many rejections / warnings the human summary lists.
const SAMPLE: usize = 10;

pub fn cmd_rebuild(ctx: &Context, root: &Path, json: bool) -> Result<(), CliError> {
    let root = checked_root(root)?;
    warn_missing_sources(ctx, root);
    let mut store = ctx.open_store(root)?;
    let summary = store.reset_and_rebuild(root, &ctx.settings.sources, &ctx.settings.adapter_options())?;
    print_summary(&summary, json)
}

pub fn cmd_refresh(ctx: &Context, root: &Path, json: bool) -> Result<(), CliError> {
    let root = checked_root(root)?;
    warn_missing_sources(ctx, root);
    let mut store = ctx.open_store(root)?;
    let summary = store.ingest_incremental(root, &ctx.settings.sources, &ctx.settings.adapter_options())?;
    print_summary(&summary, json)
}

pub fn cmd_validate(ctx: &Context, root: &Path, json: bool) -> Result<(), CliError> {
    let root = checked_root(root)?;
    let mut store = ctx.open_store(root)?;
    let report = store.validate(root, &ctx.settings.sources, &ctx.settings.adapter_options())?;

    if json {
        print_json(&report)?;
    } else {
        print_validation(&report);
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::new(
            EXIT_DIVERGENCE,
            format!("{} divergence(s) between source files and store", report.divergences.len()),
        )
        .with_hint("`sdiary refresh` ingests new rows; `sdiary rebuild` resets the store"))
    }
}

fn warn_missing_sources(ctx: &Context, root: &Path) {
    for source in &ctx.settings.sources {
        let dir = root.join(&source.dir);
        if !dir.is_dir() {
            tracing::warn!("{} source folder not found: {}", source.kind, dir.display());
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::io(format!("cannot serialize: {e}")))?;
    println!("{text}");
    Ok(())
}

fn print_summary(summary: &IngestSummary, json: bool) -> Result<(), CliError> {
    if json {
        return print_json(summary);
    }

    println!(
        "{}: {} inserted, {} unchanged ({} files, {} sheets)",
        summary.mode, summary.entries_inserted, summary.entries_unchanged, summary.files_scanned, summary.sheets_parsed
    );
    if !summary.rejections.is_empty() {
        println!("{} row(s) rejected:", summary.rejections.len());
        for r in summary.sample_rejections(SAMPLE) {
            println!("  {r}");
        }
        more(summary.rejections.len());
    }
    if !summary.file_warnings.is_empty() {
        println!("{} file(s) or sheet(s) skipped:", summary.file_warnings.len());
        for w in summary.sample_warnings(SAMPLE) {
            println!("  {w}");
        }
        more(summary.file_warnings.len());
    }
    Ok(())
}

fn more(total: usize) {
    if total > SAMPLE {
        println!("  ... and {} more", total - SAMPLE);
    }
}

fn print_validation(report: &ValidationReport) {
    println!(
        "validate: {} files, {} sheets, {} stored entries",
        report.files_scanned, report.documents_checked, report.entries_checked
    );
    if report.is_clean() {
        println!("store matches source files");
        return;
    }
    for d in &report.divergences {
        println!("  {d}");
    }
}
