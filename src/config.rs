//! Configuration management for askcmd.
//!
//! Configuration is loaded from `~/.config/askcmd/config.json`. Set
//! `ASKCMD_HOME` to keep config and history somewhere else.

use crate::error::Error;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable checked first when no key is stored.
pub const PRIMARY_KEY_VAR: &str = "ASKCMD_API_KEY";

/// Environment variable checked last.
pub const SECONDARY_KEY_VAR: &str = "OPENAI_API_KEY";

/// Overrides the storage directory.
pub const HOME_VAR: &str = "ASKCMD_HOME";

/// Persisted configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfig {
    /// API key for the completion endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl StoredConfig {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(home) = std::env::var_os(HOME_VAR) {
            return Ok(PathBuf::from(home));
        }
        dirs::config_dir()
            .map(|p| p.join("askcmd"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Get the history file path.
    pub fn history_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("history.json"))
    }

    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Ok(Self::load_from(&Self::config_path()?))
    }

    /// Load configuration from `path`.
    ///
    /// A missing, unreadable or corrupt file yields the empty default.
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {}", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(source) => {
                let err = Error::ConfigCorrupt {
                    path: path.to_path_buf(),
                    source,
                };
                warn!("{}; using defaults", err);
                Self::default()
            }
        }
    }

    /// Save configuration to `path`, creating the parent directory.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Store a new API key in the config file at `path`.
    pub fn set_api_key(path: &Path, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            bail!("API key must not be empty");
        }

        let mut config = Self::load_from(path);
        config.api_key = Some(key.to_string());
        config.save_to(path)
    }

    /// Resolve the credential to use.
    ///
    /// The first non-blank value wins: stored key, then [`PRIMARY_KEY_VAR`],
    /// then [`SECONDARY_KEY_VAR`]. `lookup` reads an environment variable.
    pub fn resolve_credential<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        non_blank(self.api_key.clone())
            .or_else(|| non_blank(lookup(PRIMARY_KEY_VAR)))
            .or_else(|| non_blank(lookup(SECONDARY_KEY_VAR)))
    }

    /// The stored key with all but its last four characters hidden.
    pub fn masked_key(&self) -> Option<String> {
        let key = self.api_key.as_deref()?.trim();
        if key.is_empty() {
            return None;
        }
        let chars: Vec<char> = key.chars().collect();
        let visible = chars.len().min(4);
        let tail: String = chars[chars.len() - visible..].iter().collect();
        Some(format!("{}{}", "*".repeat(chars.len() - visible), tail))
    }
}
