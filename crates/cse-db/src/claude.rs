//! Claude Desktop conversation store (`state.db`).

use std::path::Path;

use cse_core::record::{MessagePart, MessageRecord, SessionRecord};
use cse_core::timestamp::{format_rfc3339, parse_timestamp};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::{DbError, SessionProvider, column_text, has_table, open_read_only, sql_limit};

const PROVIDER_NAME: &str = "claude-code";
const UNTITLED: &str = "Untitled Conversation";
const MODEL: &str = "claude";
const MODEL_PROVIDER: &str = "anthropic";

/// Read-only view of a Claude Desktop database.
pub struct ClaudeDesktop {
    conn: Connection,
}

impl ClaudeDesktop {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = open_read_only(path)?;
        tracing::debug!(path = %path.display(), "opened claude database");
        Ok(Self { conn })
    }

    /// Whether `path` is a database with a `conversations` table.
    pub fn discover(path: &Path) -> bool {
        path.is_file() && open_read_only(path).is_ok_and(|conn| has_table(&conn, "conversations"))
    }

    fn session_from_row(&self, row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
        let id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let created_at = column_text(row, 2)?.filter(|s| !s.is_empty());
        let updated_at = column_text(row, 3)?.filter(|s| !s.is_empty());

        Ok(SessionRecord {
            title: Some(if name.is_empty() {
                UNTITLED.to_string()
            } else {
                name
            }),
            created_at: updated_at.or(created_at),
            message_count: self.count_messages(&id),
            metadata: Some(PROVIDER_NAME.to_string()),
            id,
        })
    }

    fn count_messages(&self, conversation_id: &str) -> Option<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM chat_messages WHERE conversation_uuid = ?",
                [conversation_id],
                |row| row.get(0),
            )
            .inspect_err(|err| {
                tracing::debug!(conversation_id, error = %err, "failed to count messages");
            })
            .ok()
    }
}

impl SessionProvider for ClaudeDesktop {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT uuid, COALESCE(name, ''), created_at, updated_at
            FROM conversations
            ORDER BY updated_at DESC
            LIMIT ?
            ",
        )?;
        let rows = stmt.query_map([sql_limit(limit)], |row| self.session_from_row(row))?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    fn fetch_session(&self, session_id: &str) -> Result<SessionRecord, DbError> {
        self.conn
            .query_row(
                "
                SELECT uuid, COALESCE(name, ''), created_at, updated_at
                FROM conversations
                WHERE uuid = ?
                ",
                [session_id],
                |row| self.session_from_row(row),
            )
            .optional()?
            .ok_or_else(|| DbError::SessionNotFound(session_id.to_string()))
    }

    fn list_messages(&self, session_id: &str) -> Result<Vec<MessageRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT uuid, COALESCE(sender, ''), COALESCE(text, ''), created_at
            FROM chat_messages
            WHERE conversation_uuid = ?
            ORDER BY created_at ASC
            ",
        )?;
        let rows = stmt.query_map([session_id], |row| {
            let sender: String = row.get(1)?;
            let text: String = row.get(2)?;
            Ok(MessageRecord {
                id: row.get(0)?,
                role: role_for_sender(&sender).to_string(),
                parts: vec![MessagePart::plain(text)],
                model: Some(MODEL.to_string()),
                provider: Some(MODEL_PROVIDER.to_string()),
                created_at: column_text(row, 3)?.as_deref().and_then(normalize_timestamp),
            })
        })?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

fn role_for_sender(sender: &str) -> &'static str {
    if sender.eq_ignore_ascii_case("assistant") || sender.eq_ignore_ascii_case("claude") {
        "assistant"
    } else {
        "user"
    }
}

/// RFC 3339 when the value parses, the raw value otherwise; `None` when empty.
fn normalize_timestamp(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }
    Some(parse_timestamp(raw).map_or_else(|| raw.to_string(), |dt| format_rfc3339(&dt)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn fixture() -> (TempDir, std::path::PathBuf) {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.db");
        let conn = Connection::open(&path).expect("create db");
        conn.execute_batch(
            "
            CREATE TABLE conversations (
                uuid TEXT PRIMARY KEY,
                name TEXT,
                created_at TEXT,
                updated_at TEXT
            );
            CREATE TABLE chat_messages (
                uuid TEXT PRIMARY KEY,
                conversation_uuid TEXT,
                sender TEXT,
                text TEXT,
                created_at TEXT
            );
            INSERT INTO conversations VALUES
                ('c1', 'Rust lifetimes', '2024-01-01T09:00:00Z', '2024-01-02T09:00:00Z'),
                ('c2', NULL, '2024-01-03 08:00:00', '');
            INSERT INTO chat_messages VALUES
                ('x2', 'c1', 'claude', 'Lifetimes describe scopes.', '2024-01-01T09:00:05.250Z'),
                ('x1', 'c1', 'human', 'What is a lifetime?', '2024-01-01T09:00:00Z'),
                ('x3', 'c1', 'Assistant', NULL, 'yesterday');
            ",
        )
        .expect("seed db");
        (temp, path)
    }

    #[test]
    fn sessions_use_fallback_title_and_latest_timestamp() {
        let (_temp, path) = fixture();
        let claude = ClaudeDesktop::open(&path).expect("open");

        let sessions = claude.list_sessions(10).expect("list");
        assert_eq!(sessions.len(), 2);

        let c1 = sessions.iter().find(|s| s.id == "c1").expect("c1");
        assert_eq!(c1.title.as_deref(), Some("Rust lifetimes"));
        assert_eq!(c1.created_at.as_deref(), Some("2024-01-02T09:00:00Z"));
        assert_eq!(c1.message_count, Some(3));
        assert_eq!(c1.metadata.as_deref(), Some("claude-code"));

        let c2 = claude.fetch_session("c2").expect("fetch");
        assert_eq!(c2.title.as_deref(), Some(UNTITLED));
        assert_eq!(c2.created_at.as_deref(), Some("2024-01-03 08:00:00"));
        assert_eq!(c2.message_count, Some(0));
    }

    #[test]
    fn messages_map_senders_and_normalize_timestamps() {
        let (_temp, path) = fixture();
        let claude = ClaudeDesktop::open(&path).expect("open");

        let messages = claude.list_messages("c1").expect("messages");
        let summary: Vec<_> = messages
            .iter()
            .map(|m| (m.id.as_str(), m.role.as_str(), m.created_at.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("x1", "user", Some("2024-01-01T09:00:00Z")),
                ("x2", "assistant", Some("2024-01-01T09:00:05.250Z")),
                ("x3", "assistant", Some("yesterday")),
            ]
        );
        assert_eq!(messages[0].model.as_deref(), Some("claude"));
        assert_eq!(messages[0].provider.as_deref(), Some("anthropic"));
        assert_eq!(messages[2].parts, vec![MessagePart::plain("")]);
    }

    #[test]
    fn missing_conversation_is_not_found() {
        let (_temp, path) = fixture();
        let claude = ClaudeDesktop::open(&path).expect("open");
        assert!(matches!(
            claude.fetch_session("zzz"),
            Err(DbError::SessionNotFound(_))
        ));
    }

    #[test]
    fn discover_requires_conversations_table() {
        let (temp, path) = fixture();
        assert!(ClaudeDesktop::discover(&path));

        let other = temp.path().join("other.db");
        Connection::open(&other)
            .expect("create db")
            .execute_batch("CREATE TABLE sessions (id TEXT);")
            .expect("create table");
        assert!(!ClaudeDesktop::discover(&other));
    }

    #[test]
    fn normalize_timestamp_handles_epoch_and_garbage() {
        assert_eq!(
            normalize_timestamp("1704067200").as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(normalize_timestamp("soon").as_deref(), Some("soon"));
        assert_eq!(normalize_timestamp("  "), None);
    }
}
