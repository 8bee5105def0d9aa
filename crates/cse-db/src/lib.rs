//! Session providers for the databases of AI coding tools.
//!
//! Each provider reads one tool's SQLite store and hands back the internal
//! record shape from [`cse_core::record`]. Databases are always opened
//! read-only; nothing here ever writes to a tool's store.
//!
//! # Thread Safety
//!
//! Providers wrap a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A provider can be moved to another thread but not shared between threads.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use cse_core::record::{MessageRecord, MessagesBySession, SessionRecord};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use thiserror::Error;

mod claude;
mod crush;

pub use claude::ClaudeDesktop;
pub use crush::Crush;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The database file could not be opened.
    #[error("failed to open database {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

/// A source of chat sessions.
pub trait SessionProvider {
    /// Stable provider name, e.g. `crush`.
    fn name(&self) -> &'static str;

    /// Most recent sessions first, at most `limit` of them.
    fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DbError>;

    fn fetch_session(&self, session_id: &str) -> Result<SessionRecord, DbError>;

    /// Messages of one session in chronological order.
    fn list_messages(&self, session_id: &str) -> Result<Vec<MessageRecord>, DbError>;

    /// Messages of every given session, keyed by session id.
    fn messages_by_session(
        &self,
        sessions: &[SessionRecord],
    ) -> Result<MessagesBySession, DbError> {
        let mut messages = MessagesBySession::with_capacity(sessions.len());
        for session in sessions {
            let list = self.list_messages(&session.id)?;
            tracing::debug!(
                provider = self.name(),
                session_id = %session.id,
                messages = list.len(),
                "loaded messages"
            );
            messages.insert(session.id.clone(), list);
        }
        Ok(messages)
    }
}

/// The supported session stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Crush,
    ClaudeCode,
}

impl ProviderKind {
    pub const ALL: [Self; 2] = [Self::Crush, Self::ClaudeCode];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Crush => "crush",
            Self::ClaudeCode => "claude-code",
        }
    }

    /// Display name of the tool, recorded as the archive's browser.
    #[must_use]
    pub const fn tool_name(&self) -> &'static str {
        match self {
            Self::Crush => "Crush",
            Self::ClaudeCode => "Claude Code",
        }
    }

    /// Whether a usable database for this provider exists at `path`.
    pub fn discover(&self, path: &Path) -> bool {
        match self {
            Self::Crush => Crush::discover(path),
            Self::ClaudeCode => ClaudeDesktop::discover(path),
        }
    }

    /// Opens the database at `path` with this provider.
    pub fn open(&self, path: &Path) -> Result<Box<dyn SessionProvider>, DbError> {
        Ok(match self {
            Self::Crush => Box::new(Crush::open(path)?),
            Self::ClaudeCode => Box::new(ClaudeDesktop::open(path)?),
        })
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crush" => Ok(Self::Crush),
            "claude-code" | "claude" => Ok(Self::ClaudeCode),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

/// Error type for provider names outside `crush | claude-code | claude`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider: {0:?} (expected crush or claude-code)")]
pub struct UnknownProvider(pub String);

fn open_read_only(path: &Path) -> Result<Connection, DbError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).map_err(|source| DbError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    // Opening is lazy; touch the schema so a non-database file fails here.
    conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|source| DbError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(conn)
}

fn has_table(conn: &Connection, table: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [table],
        |row| row.get::<_, i64>(0),
    )
    .is_ok_and(|count| count > 0)
}

/// Reads a loosely-typed column as text.
///
/// Tools store timestamps as epoch integers or strings interchangeably.
fn column_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(value.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    })
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
