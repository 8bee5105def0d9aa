//! Configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cse_db::ProviderKind;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Directory name under the platform config dir.
const APP_DIR: &str = "crush-session-explorer";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the Crush database.
    pub database_path: PathBuf,
    /// Path to the Claude Desktop database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_database_path: Option<PathBuf>,
    /// Where rendered sessions are written.
    pub output_dir: PathBuf,
    /// Default maximum number of sessions to list or export.
    pub limit: usize,
    /// Client identifier override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(".crush/crush.db"),
            claude_database_path: default_claude_database_path(),
            output_dir: PathBuf::from(".crush/sessions"),
            limit: 50,
            client_id: None,
        }
    }
}

impl Config {
    /// Loads configuration from the default locations, optionally layering a
    /// specific file on top.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // CSE_DATABASE_PATH, CSE_CLIENT_ID, ...
        figment = figment.merge(Env::prefixed("CSE_"));

        figment.extract()
    }

    /// The database a provider reads from.
    pub fn database_for(&self, kind: ProviderKind) -> Result<&Path> {
        match kind {
            ProviderKind::Crush => Ok(&self.database_path),
            ProviderKind::ClaudeCode => self
                .claude_database_path
                .as_deref()
                .context("no Claude database path configured (set claude_database_path)"),
        }
    }
}

/// Returns the platform-specific config directory for this tool.
///
/// On Linux: `~/.config/crush-session-explorer`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR))
}

/// Claude Desktop keeps `state.db` in its own config directory.
fn default_claude_database_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("Claude").join("state.db"))
}
