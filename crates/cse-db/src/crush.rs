//! Crush session store (`.crush/crush.db`).

use std::path::Path;

use cse_core::classify::{TOOL_CALL_MARKER, TOOL_RESULT_MARKER};
use cse_core::format::ContentType;
use cse_core::record::{MessagePart, MessageRecord, SessionRecord};
use rusqlite::{Connection, OptionalExtension, Row};
use serde_json::Value;

use crate::{DbError, SessionProvider, column_text, open_read_only, sql_limit};

const PROVIDER_NAME: &str = "crush";

/// Tool inputs at or above this many bytes are left out of the flattened text.
const MAX_INLINE_INPUT: usize = 200;

/// Read-only view of a Crush database.
pub struct Crush {
    conn: Connection,
}

impl Crush {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = open_read_only(path)?;
        tracing::debug!(path = %path.display(), "opened crush database");
        Ok(Self { conn })
    }

    /// Whether `path` is an openable database.
    pub fn discover(path: &Path) -> bool {
        path.is_file() && open_read_only(path).is_ok()
    }
}

impl SessionProvider for Crush {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, title, created_at, message_count
            FROM sessions
            ORDER BY created_at DESC
            LIMIT ?
            ",
        )?;
        let rows = stmt.query_map([sql_limit(limit)], session_from_row)?;
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
                SELECT id, title, created_at, message_count
                FROM sessions
                WHERE id = ?
                ",
                [session_id],
                session_from_row,
            )
            .optional()?
            .ok_or_else(|| DbError::SessionNotFound(session_id.to_string()))
    }

    fn list_messages(&self, session_id: &str) -> Result<Vec<MessageRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, role, parts, model, provider, created_at
            FROM messages
            WHERE session_id = ?
            ORDER BY created_at ASC
            ",
        )?;
        let rows = stmt.query_map([session_id], |row| {
            let parts: Option<String> = column_text(row, 2)?;
            Ok(MessageRecord {
                id: row.get(0)?,
                role: row.get(1)?,
                parts: parts.as_deref().map(flatten_parts).unwrap_or_default(),
                model: row.get(3)?,
                provider: row.get(4)?,
                created_at: column_text(row, 5)?,
            })
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let message = row?;
            if message.parts.is_empty() {
                tracing::debug!(message_id = %message.id, "skipping message without content");
                continue;
            }
            messages.push(message);
        }
        Ok(messages)
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: column_text(row, 2)?,
        message_count: row.get(3)?,
        metadata: Some(PROVIDER_NAME.to_string()),
    })
}

/// Flattens Crush's `parts` JSON into text fragments.
///
/// Tool calls and results are rendered with their marker prefix and tagged
/// with their kind. Finish markers, unknown part types and whitespace-only
/// text are dropped. Unparseable JSON yields no fragments.
fn flatten_parts(raw: &str) -> Vec<MessagePart> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    let parts: Vec<Value> = match serde_json::from_str(raw) {
        Ok(parts) => parts,
        Err(err) => {
            tracing::debug!(error = %err, "ignoring unparseable message parts");
            return Vec::new();
        }
    };
    parts.iter().filter_map(flatten_part).collect()
}

fn flatten_part(part: &Value) -> Option<MessagePart> {
    match part {
        Value::String(text) => non_blank(text).map(MessagePart::plain),
        Value::Object(obj) => {
            let data = obj.get("data");
            match obj.get("type").and_then(Value::as_str) {
                Some("text") => data
                    .and_then(|d| str_field(d, "text"))
                    .and_then(non_blank)
                    .map(|text| MessagePart::tagged(ContentType::Text, text)),
                Some("tool_call") => {
                    let data = data?;
                    let name = str_field(data, "name")?;
                    let mut text = format!("{TOOL_CALL_MARKER} Tool call: {name}");
                    if let Some(input) =
                        str_field(data, "input").filter(|i| i.len() < MAX_INLINE_INPUT)
                    {
                        text.push_str("\nInput: ");
                        text.push_str(input);
                    }
                    Some(MessagePart::tagged(ContentType::ToolCall, text))
                }
                Some("tool_result") => data
                    .and_then(|d| str_field(d, "content"))
                    .and_then(non_blank)
                    .map(|content| {
                        MessagePart::tagged(
                            ContentType::ToolResult,
                            format!("{TOOL_RESULT_MARKER} Tool result:\n{content}"),
                        )
                    }),
                Some(_) => None,
                // Older stores wrote untyped objects.
                None => match obj.get("text") {
                    Some(text) => text.as_str().and_then(non_blank).map(MessagePart::plain),
                    None => data
                        .and_then(|d| str_field(d, "text"))
                        .and_then(non_blank)
                        .map(MessagePart::plain),
                },
            }
        }
        _ => None,
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn non_blank(text: &str) -> Option<&str> {
    (!text.trim().is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn fixture() -> (TempDir, std::path::PathBuf) {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("crush.db");
        let conn = Connection::open(&path).expect("create db");
        conn.execute_batch(
            r#"
            CREATE TABLE sessions (
                id TEXT PRIMARY KEY,
                title TEXT,
                created_at INTEGER,
                message_count INTEGER
            );
            CREATE TABLE messages (
                id TEXT PRIMARY KEY,
                session_id TEXT,
                role TEXT NOT NULL,
                parts TEXT,
                model TEXT,
                provider TEXT,
                created_at INTEGER
            );
            INSERT INTO sessions VALUES ('old', 'Old session', 1704067200, 1);
            INSERT INTO sessions VALUES ('new', 'New session', 1704153600, 3);
            INSERT INTO sessions VALUES ('untitled', NULL, 1704110400, 0);

            INSERT INTO messages VALUES
                ('m2', 'new', 'assistant',
                 '[{"type":"text","data":{"text":"Listing files."}},
                   {"type":"tool_call","data":{"name":"bash","input":"ls -la"}},
                   {"type":"finish","data":{"reason":"end_turn"}}]',
                 'claude-3-opus', 'anthropic', 1704153660),
                ('m1', 'new', 'user', '[{"type":"text","data":{"text":"show files"}}]',
                 NULL, NULL, 1704153600),
                ('m3', 'new', 'tool',
                 '[{"type":"tool_result","data":{"content":"Cargo.toml"}}]',
                 NULL, NULL, 1704153720),
                ('m4', 'new', 'assistant', '[{"type":"finish","data":{}}]',
                 NULL, NULL, 1704153780);
            "#,
        )
        .expect("seed db");
        (temp, path)
    }

    #[test]
    fn lists_sessions_newest_first_with_limit() {
        let (_temp, path) = fixture();
        let crush = Crush::open(&path).expect("open");

        let sessions = crush.list_sessions(2).expect("list");
        let ids: Vec<_> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "untitled"]);
        assert_eq!(sessions[0].created_at.as_deref(), Some("1704153600"));
        assert_eq!(sessions[0].metadata.as_deref(), Some("crush"));
        assert_eq!(sessions[1].title, None);
    }

    #[test]
    fn fetch_missing_session_is_not_found() {
        let (_temp, path) = fixture();
        let crush = Crush::open(&path).expect("open");

        assert_eq!(crush.fetch_session("old").expect("fetch").message_count, Some(1));
        let err = crush.fetch_session("nope").expect_err("missing");
        assert!(matches!(err, DbError::SessionNotFound(ref id) if id == "nope"));
    }

    #[test]
    fn messages_are_ordered_and_flattened() {
        let (_temp, path) = fixture();
        let crush = Crush::open(&path).expect("open");

        let messages = crush.list_messages("new").expect("messages");
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);

        let texts: Vec<_> = messages[1].texts().collect();
        assert_eq!(
            texts,
            vec!["Listing files.", "🔧 Tool call: bash\nInput: ls -la"]
        );
        assert_eq!(messages[1].parts[1].kind, Some(ContentType::ToolCall));
        assert_eq!(messages[1].model.as_deref(), Some("claude-3-opus"));
        assert_eq!(messages[2].parts[0].text, "📋 Tool result:\nCargo.toml");
    }

    #[test]
    fn flatten_handles_legacy_and_blank_parts() {
        let parts = flatten_parts(
            r#"["plain", "   ", {"text":"legacy"}, {"data":{"text":"nested"}},
                {"type":"text","data":{"text":"  "}}, {"type":"image","data":{}}, 42]"#,
        );
        let texts: Vec<_> = parts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["plain", "legacy", "nested"]);
        assert!(parts.iter().all(|p| p.kind.is_none()));
    }

    #[test]
    fn long_tool_input_is_omitted() {
        let input = "x".repeat(MAX_INLINE_INPUT);
        let raw = serde_json::json!([{"type":"tool_call","data":{"name":"write","input":input}}]);
        let parts = flatten_parts(&raw.to_string());
        assert_eq!(parts[0].text, "🔧 Tool call: write");
    }

    #[test]
    fn invalid_parts_json_yields_nothing() {
        assert!(flatten_parts("{not json").is_empty());
        assert!(flatten_parts("").is_empty());
    }

    #[test]
    fn discover_requires_a_database_file() {
        let (temp, path) = fixture();
        assert!(Crush::discover(&path));
        assert!(!Crush::discover(&temp.path().join("absent.db")));
        assert!(!Crush::discover(temp.path()));
    }
}
