// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::model::SortDirection;
use crate::storage;
use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

fn default_completed_sort() -> SortDirection {
    SortDirection::Descending
}

fn default_io_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Overrides the discovered calendars directory.
    #[serde(default)]
    pub calendars_dir: Option<PathBuf>,
    #[serde(default)]
    pub incomplete_sort: SortDirection,
    #[serde(default = "default_completed_sort")]
    pub completed_sort: SortDirection,
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calendars_dir: None,
            incomplete_sort: SortDirection::Ascending,
            completed_sort: default_completed_sort(),
            io_timeout_secs: default_io_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;

        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(ctx: &dyn AppContext) -> Result<Self> {
        match Self::load(ctx) {
            Ok(config) => Ok(config),
            Err(e) if Self::is_missing_config_error(&e) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }

        err.chain().any(|cause| {
            cause
                .downcast_ref::<std::io::Error>()
                .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
        })
    }

    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        storage::with_lock::<_, _, Error>(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            storage::atomic_write(&path, toml_str)?;
            Ok(())
        })
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs.max(1))
    }

    /// Unknown level names fall back to `Warn`.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Warn)
    }

    pub fn resolve_calendars_dir(&self, ctx: &dyn AppContext) -> Result<PathBuf> {
        match &self.calendars_dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|e| {
                    anyhow::anyhow!("Failed to create directory '{}': {}", dir.display(), e)
                })?;
                Ok(dir.clone())
            }
            None => ctx.get_calendars_dir(),
        }
    }
}
