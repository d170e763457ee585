// sdiary - site diary ingestion, drift validation, dedup and coverage
// Every store-backed command maps onto one store or engine operation.

mod audit;
mod exit_codes;
mod export;
mod ingest;
mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sitediary_config::{ConfigError, Settings};
use sitediary_store::{Store, StoreError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use exit_codes::{store_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "sdiary")]
#[command(about = "Ingest site diary spreadsheets, check drift, find duplicates and coverage gaps")]
#[command(version)]
#[command(long_version = long_version())]
struct Cli {
    /// Settings file (default: <config dir>/sitediary/settings.toml)
    #[arg(long, global = true, env = "SDIARY_CONFIG")]
    config: Option<PathBuf>,

    /// Store file, overriding [store] database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log filter used when SDIARY_LOG is unset (e.g. "info", "sitediary_store=debug")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop all entries and re-ingest every source file
    #[command(after_help = "\
Examples:
  sdiary rebuild --root ~/site
  sdiary rebuild --root . --json")]
    Rebuild {
        /// Project root holding the source folders
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Ingest only rows not already stored
    Refresh {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Compare the source files against the store without changing it
    #[command(after_help = "\
Exits 3 when any divergence is found.")]
    Validate {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Write duplicate clusters and roll-ups
    #[command(after_help = "\
Writes duplicates.csv, activities_unique.csv, personnel_variants.csv and
duplicates.json into --out.

Examples:
  sdiary dedupe --out analysis
  sdiary dedupe --out analysis --threshold 0.9")]
    Dedupe {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Output directory (created if needed)
        #[arg(long, default_value = "analysis")]
        out: PathBuf,

        /// Cross-source similarity threshold, overriding [dedup]
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// List dates missing an expected source kind
    Coverage {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Write the daily summary as JSON and CSV
    Summary {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(long, default_value = "analysis")]
        out: PathBuf,
    },

    /// Write one CSV of stored entries per source kind
    Extract {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(long, default_value = "analysis")]
        out: PathBuf,
    },

    /// Entry counts, recent runs and per-day totals
    Status {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Audit write-back for an external reviewer
    #[command(subcommand)]
    Audit(audit::AuditCommands),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("SDIARY_COMMIT"),
        ")",
        "\ntarget:  ",
        env!("SDIARY_TARGET"),
        "\nschema:  store v2",
    )
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env("SDIARY_LOG")
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = Context::load(cli.config.as_deref(), cli.db).and_then(|ctx| match cli.command {
        Commands::Rebuild { root, json } => ingest::cmd_rebuild(&ctx, &root, json),
        Commands::Refresh { root, json } => ingest::cmd_refresh(&ctx, &root, json),
        Commands::Validate { root, json } => ingest::cmd_validate(&ctx, &root, json),
        Commands::Dedupe { root, out, threshold } => report::cmd_dedupe(&ctx, &root, &out, threshold),
        Commands::Coverage { root, json } => report::cmd_coverage(&ctx, &root, json),
        Commands::Summary { root, out } => report::cmd_summary(&ctx, &root, &out),
        Commands::Extract { root, out } => report::cmd_extract(&ctx, &root, &out),
        Commands::Status { root, json } => report::cmd_status(&ctx, &root, json),
        Commands::Audit(cmd) => audit::cmd_audit(&ctx, cmd),
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Shared command context
// ---------------------------------------------------------------------------

pub struct Context {
    pub settings: Settings,
    db: Option<PathBuf>,
}

impl Context {
    fn load(config: Option<&Path>, db: Option<PathBuf>) -> Result<Self, CliError> {
        let settings = Settings::load(config).map_err(CliError::config)?;
        Ok(Self { settings, db })
    }

    pub fn database_path(&self, root: &Path) -> PathBuf {
        self.db.clone().unwrap_or_else(|| self.settings.database_path(root))
    }

    /// Open (and migrate) the store for `root`.
    pub fn open_store(&self, root: &Path) -> Result<Store, CliError> {
        let path = self.database_path(root);
        tracing::debug!("store: {}", path.display());
        Store::open(&path, &self.settings.store_options()).map_err(CliError::store)
    }
}

/// The project root must exist before anything touches the store.
pub fn checked_root(root: &Path) -> Result<&Path, CliError> {
    if root.is_dir() {
        Ok(root)
    } else {
        Err(CliError::usage(format!("root directory not found: {}", root.display())))
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn store(err: StoreError) -> Self {
        let hint = match &err {
            StoreError::Busy => Some("another sdiary run is using this store; wait for it to finish and retry"),
            StoreError::Migration(_) => Some("the store was not modified; check the file or rebuild into a new --db"),
            StoreError::UnknownEntry(_) => Some("list candidates with `sdiary audit pending`"),
            _ => None,
        };
        Self {
            code: store_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(String::from),
        }
    }

    pub fn config(err: ConfigError) -> Self {
        Self::new(EXIT_CONFIG, err.to_string())
            .with_hint(format!("default settings path: {}", Settings::default_path().display()))
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        CliError::store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_attach_to_any_error() {
        let err = CliError::usage("bad root").with_hint("pass --root");
        assert_eq!(err.code, EXIT_USAGE);
        assert_eq!(err.hint.as_deref(), Some("pass --root"));

        let err = CliError::config(ConfigError::Invalid("no sources".into()));
        assert_eq!(err.code, EXIT_CONFIG);
        assert!(err.hint.is_some_and(|h| h.starts_with("default settings path")));
    }

    #[test]
    fn busy_store_gets_retry_hint() {
        let err = CliError::from(StoreError::Busy);
        assert_eq!(err.code, exit_codes::EXIT_BUSY);
        assert!(err.hint.is_some_and(|h| h.contains("retry")));
    }
}
