//! Client identity management.
//!
//! Each installation gets a persistent UUID stored in `client-id` under the
//! config directory. Individually exported sessions are stamped with it so
//! archives from several machines can be told apart.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::Config;

/// Where a resolved client id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientIdSource {
    /// Set in configuration (`CSE_CLIENT_ID` or the config file).
    Override,
    /// Read from the `client-id` file.
    Persisted,
    /// Generated by this run.
    Generated,
}

impl ClientIdSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::Persisted => "persisted",
            Self::Generated => "generated",
        }
    }
}

impl fmt::Display for ClientIdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId {
    pub id: String,
    pub source: ClientIdSource,
}

/// Returns the path to the `client-id` file in the config directory.
pub fn client_id_path() -> Option<PathBuf> {
    crate::config::dirs_config_path().map(|dir| dir.join("client-id"))
}

/// Resolves the client id: configured override, then the persisted file,
/// then a freshly generated UUID.
///
/// Never fails. A generated id that cannot be persisted is still returned.
pub fn resolve(config: &Config) -> ClientId {
    resolve_at(config.client_id.as_deref(), client_id_path().as_deref())
}

/// Resolves the client id against a specific file.
pub(crate) fn resolve_at(override_id: Option<&str>, path: Option<&Path>) -> ClientId {
    if let Some(id) = override_id.map(str::trim).filter(|id| !id.is_empty()) {
        return ClientId {
            id: id.to_string(),
            source: ClientIdSource::Override,
        };
    }

    if let Some(id) = path.and_then(load_from) {
        return ClientId {
            id,
            source: ClientIdSource::Persisted,
        };
    }

    let id = Uuid::new_v4().to_string();
    match path {
        Some(path) => {
            if let Err(err) = save_to(path, &id) {
                tracing::warn!(path = %path.display(), error = %err, "failed to persist client id");
            }
        }
        None => tracing::warn!("no config directory; client id will not be persisted"),
    }

    ClientId {
        id,
        source: ClientIdSource::Generated,
    }
}

/// Reads a persisted id; missing, unreadable or blank files yield `None`.
fn load_from(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let id = content.trim();
            (!id.is_empty()).then(|| id.to_string())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read client id");
            None
        }
    }
}

fn save_to(path: &Path, id: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    std::fs::write(path, id).context("failed to write client id")?;
    Ok(())
}
