// Project settings
// Loaded from ~/.config/sitediary/settings.toml unless a path is given

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sitediary_core::normalize::AliasTable;
use sitediary_io::{AdapterOptions, SourceSpec, DEFAULT_EXTENSIONS, DEFAULT_HEADER_SCAN_ROWS};
use sitediary_recon::{CoverageConfig, DedupConfig, ReconConfig};
use sitediary_store::StoreOptions;

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Relative paths resolve against the project root.
    pub database: PathBuf,
    /// Zero = fail fast when another run holds the store.
    pub busy_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("diary.sqlite"),
            busy_timeout_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterSettings {
    pub header_scan_rows: usize,
    pub extensions: Vec<String>,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            header_scan_rows: DEFAULT_HEADER_SCAN_ROWS,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub sources: Vec<SourceSpec>,
    pub adapter: AdapterSettings,
    pub dedup: DedupConfig,
    pub coverage: CoverageConfig,
    /// Person spelling → canonical name.
    pub aliases: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreSettings::default(),
            sources: SourceSpec::defaults(),
            adapter: AdapterSettings::default(),
            dedup: DedupConfig::default(),
            coverage: CoverageConfig::default(),
            aliases: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Per-user settings file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sitediary")
            .join("settings.toml")
    }

    /// Load settings. An explicit path must exist; a missing default file
    /// means all defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::default_path();
                if !p.exists() {
                    log::debug!("no settings at {}, using defaults", p.display());
                    return Ok(Self::default());
                }
                p
            }
        };

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let settings = Self::parse(&contents).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse { path: Some(path.clone()), message },
            other => other,
        })?;
        log::info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse and validate a settings document.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: None,
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("at least one [[sources]] entry is required".into()));
        }
        if self.adapter.header_scan_rows == 0 {
            return Err(ConfigError::Invalid("adapter.header_scan_rows must be at least 1".into()));
        }
        if self.adapter.extensions.is_empty() {
            return Err(ConfigError::Invalid("adapter.extensions must not be empty".into()));
        }
        self.recon_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn database_path(&self, root: &Path) -> PathBuf {
        if self.store.database.is_absolute() {
            self.store.database.clone()
        } else {
            root.join(&self.store.database)
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions { busy_timeout_ms: self.store.busy_timeout_ms }
    }

    pub fn adapter_options(&self) -> AdapterOptions {
        AdapterOptions {
            header_scan_rows: self.adapter.header_scan_rows,
            aliases: self.aliases.iter().collect::<AliasTable>(),
            extensions: self
                .adapter
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn recon_config(&self) -> ReconConfig {
        ReconConfig {
            dedup: self.dedup.clone(),
            coverage: self.coverage.clone(),
        }
    }
}
