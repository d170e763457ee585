//! `sdiary audit`: the write-back surface for an external reviewer.

use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;
use sitediary_core::{AuditResult, AuditVerdict};

use crate::{checked_root, CliError, Context};

#[derive(Subcommand)]
pub enum AuditCommands {
    /// List entries with no audit verdict yet
    #[command(after_help = "\
Examples:
  sdiary audit pending --limit 20
  sdiary audit pending --json")]
    Pending {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(long, default_value_t = 50)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Record a reviewer's answer for one entry
    #[command(after_help = "\
Answers starting with PASS pass; anything else is flagged with the answer
kept as notes.

Examples:
  sdiary audit apply --entry 12 --response 'PASS' --model reviewer-v1")]
    Apply {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        entry: i64,

        #[arg(long)]
        response: String,

        #[arg(long)]
        model: String,
    },
}

#[derive(Serialize)]
struct PendingEntry<'a> {
    entry_id: i64,
    source_kind: &'static str,
    entry_date: String,
    person: &'a str,
    activity_text: &'a str,
    hours: f64,
    source_document: &'a str,
}

pub fn cmd_audit(ctx: &Context, cmd: AuditCommands) -> Result<(), CliError> {
    match cmd {
        AuditCommands::Pending { root, limit, json } => {
            let store = ctx.open_store(checked_root(&root)?)?;
            let entries = store.fetch_unaudited(limit)?;
            let pending: Vec<PendingEntry<'_>> = entries
                .iter()
                .map(|e| PendingEntry {
                    entry_id: e.entry_id,
                    source_kind: e.source_kind.as_str(),
                    entry_date: e.entry_date.to_string(),
                    person: &e.person,
                    activity_text: &e.activity_text,
                    hours: e.hours(),
                    source_document: &e.source_document,
                })
                .collect();

            if json {
                let text = serde_json::to_string_pretty(&pending)
                    .map_err(|e| CliError::io(format!("cannot serialize: {e}")))?;
                println!("{text}");
            } else {
                for p in &pending {
                    println!(
                        "{}\t{}\t{}\t{}\t{}\t{:.2}",
                        p.entry_id, p.entry_date, p.source_kind, p.person, p.activity_text, p.hours
                    );
                }
            }
            Ok(())
        }
        AuditCommands::Apply { root, entry, response, model } => {
            if model.trim().is_empty() {
                return Err(CliError::usage("--model must not be empty"));
            }
            let store = ctx.open_store(checked_root(&root)?)?;
            let result = AuditResult::new(entry, AuditVerdict::from_response(&response), model.trim());
            store.apply_audit(&result)?;
            tracing::info!("audit: entry {} {}", result.entry_id, result.status);
            println!("entry {}: {}", result.entry_id, result.status);
            Ok(())
        }
    }
}
