//! Configuration management for askdb.
//!
//! Handles loading configuration from TOML files and environment variables:
//! the NL-to-SQL service location, how queries are executed, and where the
//! application state store lives.

use crate::error::{AskdbError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Default NL-to-SQL request timeout. The hosting platform's proxy cuts
/// connections at 60s, so we give up just under it.
pub const DEFAULT_TRANSLATOR_TIMEOUT_SECS: u64 = 59;

/// Main configuration structure for askdb.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// NL-to-SQL service configuration.
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Query execution configuration.
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// State store configuration.
    #[serde(default)]
    pub store: StoreConfig,
}

/// NL-to-SQL service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Base URL of the translation service (e.g., `http://localhost:8000`).
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_translator_timeout")]
    pub timeout_secs: u64,

    /// Use the canned mock translator instead of the real service.
    /// Rejected when `ASKDB_ENV=production`.
    #[serde(default)]
    pub mock: bool,
}

fn default_translator_timeout() -> u64 {
    DEFAULT_TRANSLATOR_TIMEOUT_SECS
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_translator_timeout(),
            mock: false,
        }
    }
}

/// How SQL reaches the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Execute in-process through the per-backend executors.
    #[default]
    Direct,
    /// Proxy execution through the translation service's `/query` endpoint.
    Service,
}

/// Query execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WarehouseConfig {
    #[serde(default)]
    pub execution: ExecutionMode,
}

/// State store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Path to the SQLite state database. Defaults to the platform config
    /// directory when unset.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration with the standard precedence:
    /// explicit path > default config file > built-in defaults,
    /// then environment variable overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from_file(p)?,
            None => {
                let default = Self::default_path();
                match default {
                    Some(p) if p.exists() => Self::load_from_file(&p)?,
                    _ => Self::default(),
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AskdbError::config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        toml::from_str(&contents).map_err(|e| {
            AskdbError::config(format!("Invalid config {}: {e}", path.display()))
        })
    }

    /// Returns the default config file path (`<config dir>/askdb/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("askdb").join("config.toml"))
    }

    /// Applies `ASKDB_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ASKDB_TRANSLATOR_URL") {
            self.translator.base_url = Some(url);
        }
        if let Ok(v) = std::env::var("ASKDB_MOCK_TRANSLATOR") {
            self.translator.mock = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("ASKDB_EXECUTION") {
            match v.to_lowercase().as_str() {
                "direct" => self.warehouse.execution = ExecutionMode::Direct,
                "service" => self.warehouse.execution = ExecutionMode::Service,
                other => tracing::warn!("ignoring unknown ASKDB_EXECUTION value: {other}"),
            }
        }
        if let Ok(path) = std::env::var("ASKDB_STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }
    }

    /// Validates and returns the translator base URL.
    pub fn translator_base_url(&self) -> Result<Url> {
        let raw = self.translator.base_url.as_deref().ok_or_else(|| {
            AskdbError::config(
                "translator base URL is not set (config [translator].base_url or ASKDB_TRANSLATOR_URL)",
            )
        })?;
        Url::parse(raw)
            .map_err(|e| AskdbError::config(format!("Invalid translator base URL '{raw}': {e}")))
    }

    /// Whether the process runs in production (`ASKDB_ENV=production`).
    pub fn is_production() -> bool {
        std::env::var("ASKDB_ENV").map(|v| v == "production").unwrap_or(false)
    }

    /// Rejects mock modes in production deployments.
    pub fn ensure_mock_allowed(&self) -> Result<()> {
        if self.translator.mock && Self::is_production() {
            return Err(AskdbError::config(
                "translator mocking is enabled in production",
            ));
        }
        Ok(())
    }
}
