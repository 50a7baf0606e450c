use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dialect::{Dialect, TableFilter};

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "checkpoint.toml";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CheckpointConfig {
    pub database: DatabaseConfig,
    pub reset: ResetConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

/// What to do with tables whose foreign keys form a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Leave cyclic tables out of the reset and delete everything else.
    #[default]
    Exclude,
    /// Refuse to build a plan.
    Abort,
    /// Delete cyclic tables too, with their constraints suspended.
    Suspend,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ResetConfig {
    pub dialect: Dialect,
    pub tables_to_ignore: Vec<String>,
    pub tables_to_include: Vec<String>,
    pub schemas_to_include: Vec<String>,
    pub schemas_to_exclude: Vec<String>,
    pub check_temporal_tables: bool,
    pub with_reseed: bool,
    pub command_timeout_secs: Option<u64>,
    pub cycle_policy: CyclePolicy,
    /// Resume versioning even when the delete phase fails.
    pub restore_versioning_on_failure: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "test.db".into(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl ResetConfig {
    pub fn filter(&self) -> TableFilter {
        TableFilter {
            tables_to_ignore: self.tables_to_ignore.clone(),
            tables_to_include: self.tables_to_include.clone(),
            schemas_to_include: self.schemas_to_include.clone(),
            schemas_to_exclude: self.schemas_to_exclude.clone(),
        }
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// Returns `./checkpoint.toml`
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

impl CheckpointConfig {
    /// Load config from `./checkpoint.toml` (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CheckpointConfig::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.database.path)
    }

    /// Apply environment variable overrides (CHECKPOINT_DB, CHECKPOINT_DIALECT,
    /// CHECKPOINT_LOG_LEVEL, CHECKPOINT_COMMAND_TIMEOUT_SECS).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("CHECKPOINT_DB") {
            self.database.path = val;
        }
        if let Ok(val) = std::env::var("CHECKPOINT_DIALECT") {
            self.reset.dialect = val
                .parse()
                .map_err(anyhow::Error::msg)
                .context("invalid CHECKPOINT_DIALECT")?;
        }
        if let Ok(val) = std::env::var("CHECKPOINT_LOG_LEVEL") {
            self.log.level = val;
        }
        if let Ok(val) = std::env::var("CHECKPOINT_COMMAND_TIMEOUT_SECS") {
            let secs = val
                .parse::<u64>()
                .context("invalid CHECKPOINT_COMMAND_TIMEOUT_SECS")?;
            self.reset.command_timeout_secs = Some(secs);
        }
        Ok(())
    }
}
