//! Shared utilities for CLI commands.

use std::cmp::Reverse;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use cse_core::Archive;
use cse_core::record::{MessagesBySession, SessionRecord};
use cse_core::timestamp::parse_optional;
use cse_db::{DbError, ProviderKind, SessionProvider};
use tempfile::NamedTempFile;

use crate::Config;

/// A provider opened on its configured database.
pub struct OpenProvider {
    pub kind: ProviderKind,
    pub provider: Box<dyn SessionProvider>,
}

/// A session together with the provider it was read from.
#[derive(Debug, Clone)]
pub struct OwnedSession {
    pub kind: ProviderKind,
    pub session: SessionRecord,
}

/// Opens the configured database for `kind`.
pub fn open_provider(kind: ProviderKind, config: &Config) -> Result<Box<dyn SessionProvider>> {
    let path = config.database_for(kind)?;
    kind.open(path)
        .with_context(|| format!("failed to open {kind} database"))
}

/// Opens the requested provider, or every provider whose configured
/// database is present when none is requested.
pub fn open_providers(requested: Option<ProviderKind>, config: &Config) -> Result<Vec<OpenProvider>> {
    if let Some(kind) = requested {
        let provider = open_provider(kind, config)?;
        return Ok(vec![OpenProvider { kind, provider }]);
    }

    let mut found = Vec::new();
    for kind in ProviderKind::ALL {
        let Ok(path) = config.database_for(kind) else {
            continue;
        };
        if !kind.discover(path) {
            tracing::debug!(provider = %kind, path = %path.display(), "no database found");
            continue;
        }
        match kind.open(path) {
            Ok(provider) => {
                tracing::debug!(provider = %kind, path = %path.display(), "discovered database");
                found.push(OpenProvider { kind, provider });
            }
            Err(err) => {
                tracing::warn!(provider = %kind, error = %err, "failed to open database");
            }
        }
    }

    if found.is_empty() {
        let checked: Vec<_> = ProviderKind::ALL.iter().map(ProviderKind::as_str).collect();
        bail!("no session databases found (checked: {})", checked.join(", "));
    }
    Ok(found)
}

/// Lists up to `limit` sessions across `providers`, newest first.
///
/// With several providers, one that fails to list is skipped with a warning.
pub fn list_sessions(providers: &[OpenProvider], limit: usize) -> Result<Vec<OwnedSession>> {
    let mut sessions = Vec::new();
    for open in providers {
        match open.provider.list_sessions(limit) {
            Ok(list) => sessions.extend(list.into_iter().map(|session| OwnedSession {
                kind: open.kind,
                session,
            })),
            Err(err) if providers.len() > 1 => {
                tracing::warn!(provider = %open.kind, error = %err, "failed to list sessions");
            }
            Err(err) => return Err(err).context("failed to list sessions"),
        }
    }

    if providers.len() > 1 {
        sessions.sort_by_cached_key(|owned| Reverse(parse_optional(owned.session.created_at.as_deref())));
        sessions.truncate(limit);
    }
    Ok(sessions)
}

/// Finds a session in the first provider that has it.
pub fn fetch_session(providers: Vec<OpenProvider>, session_id: &str) -> Result<(OpenProvider, SessionRecord)> {
    for open in providers {
        match open.provider.fetch_session(session_id) {
            Ok(session) => return Ok((open, session)),
            Err(DbError::SessionNotFound(_)) => {
                tracing::debug!(provider = %open.kind, session_id, "session not in provider");
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to fetch session {session_id}"));
            }
        }
    }
    Err(DbError::SessionNotFound(session_id.to_string()))
        .with_context(|| format!("failed to fetch session {session_id}"))
}

/// Loads the messages of each session from the provider that owns it.
pub fn messages_for(providers: &[OpenProvider], sessions: &[OwnedSession]) -> Result<MessagesBySession> {
    let mut messages = MessagesBySession::with_capacity(sessions.len());
    for open in providers {
        let owned: Vec<SessionRecord> = sessions
            .iter()
            .filter(|owned| owned.kind == open.kind)
            .map(|owned| owned.session.clone())
            .collect();
        if owned.is_empty() {
            continue;
        }
        let found = open
            .provider
            .messages_by_session(&owned)
            .with_context(|| format!("failed to fetch {} messages", open.kind))?;
        messages.extend(found);
    }
    Ok(messages)
}

/// Writes `contents` to `path` through a temporary file in the same
/// directory, so readers never see a partially written file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

/// Prints the descriptor lines of an archive.
pub fn write_archive_summary<W: Write>(writer: &mut W, archive: &Archive) -> Result<()> {
    writeln!(writer, "Format version: {}", archive.version)?;
    if archive.creator.version.is_empty() {
        writeln!(writer, "Created by: {}", archive.creator.name)?;
    } else {
        writeln!(
            writer,
            "Created by: {} v{}",
            archive.creator.name, archive.creator.version
        )?;
    }
    if let Some(browser) = &archive.browser {
        writeln!(writer, "Original tool: {}", browser.name)?;
    }
    writeln!(writer, "Sessions: {}", archive.sessions().len())?;
    writeln!(writer, "Messages: {}", archive.message_count())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::commands::test_support;

    #[test]
    fn write_atomic_creates_parents_and_replaces() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a").join("b").join("out.json");

        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn discovery_opens_every_configured_database() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = test_support::config(test_support::crush_db(temp.path()), temp.path().join("out"));
        config.claude_database_path = Some(test_support::claude_db(temp.path()));

        let providers = open_providers(None, &config).unwrap();
        let kinds: Vec<_> = providers.iter().map(|open| open.kind).collect();
        assert_eq!(kinds, vec![ProviderKind::Crush, ProviderKind::ClaudeCode]);

        let sessions = list_sessions(&providers, 50).unwrap();
        let owners: Vec<_> = sessions
            .iter()
            .map(|owned| (owned.session.id.as_str(), owned.kind))
            .collect();
        assert_eq!(
            owners,
            vec![
                ("conv-2", ProviderKind::ClaudeCode),
                ("sess-0002-bbbb", ProviderKind::Crush),
                ("conv-1", ProviderKind::ClaudeCode),
                ("sess-0001-aaaa", ProviderKind::Crush),
            ]
        );

        let limited = list_sessions(&providers, 2).unwrap();
        assert_eq!(limited.len(), 2);

        let messages = messages_for(&providers, &sessions).unwrap();
        assert_eq!(messages["conv-1"][0].model.as_deref(), Some("claude"));
        assert_eq!(messages["sess-0001-aaaa"].len(), 2);
    }

    #[test]
    fn discovery_skips_missing_databases() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = test_support::config(temp.path().join("nope.db"), temp.path().join("out"));
        config.claude_database_path = Some(test_support::claude_db(temp.path()));

        let providers = open_providers(None, &config).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].kind, ProviderKind::ClaudeCode);

        config.claude_database_path = None;
        let err = open_providers(None, &config).err().unwrap();
        assert_eq!(err.to_string(), "no session databases found (checked: crush, claude-code)");
    }

    #[test]
    fn fetch_session_searches_all_providers() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = test_support::config(test_support::crush_db(temp.path()), temp.path().join("out"));
        config.claude_database_path = Some(test_support::claude_db(temp.path()));

        let (open, session) =
            fetch_session(open_providers(None, &config).unwrap(), "conv-1").unwrap();
        assert_eq!(open.kind, ProviderKind::ClaudeCode);
        assert_eq!(session.title.as_deref(), Some("Borrow checker"));

        let err = fetch_session(open_providers(None, &config).unwrap(), "nope")
            .err()
            .unwrap();
        assert_eq!(format!("{err:#}"), "failed to fetch session nope: session not found: nope");
    }

    #[test]
    fn write_atomic_fails_when_target_is_directory() {
        let temp = tempfile::tempdir().unwrap();
        let err = write_atomic(temp.path(), "x").unwrap_err();
        assert!(err.to_string().starts_with("failed to write"));
    }
}
