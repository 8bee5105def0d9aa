//! Parsing AICS archives and projecting them back into internal records.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::classify::apply_marker;
use crate::export::MESSAGE_COUNT_KEY;
use crate::format::{Archive, Content, FORMAT_VERSION, Message, Session};
use crate::record::{MessagePart, MessageRecord, MessagesBySession, SessionRecord};
use crate::timestamp::format_record_time;

/// Import errors.
///
/// A corrupt file and a file from a newer tool are distinct failures.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed archive: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported version: {found:?} (expected: {expected})")]
    UnsupportedVersion {
        found: String,
        expected: &'static str,
    },

    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Just enough of the document to gate on the version before the full parse.
#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: Option<String>,
}

/// Parses an archive from JSON bytes.
///
/// JSON syntax errors and schema mismatches are [`ImportError::Malformed`]; a
/// well-formed document with any version other than `"1.0"` is
/// [`ImportError::UnsupportedVersion`]. The archive is not validated.
pub fn import_archive(bytes: &[u8]) -> Result<Archive, ImportError> {
    let probe: VersionProbe = serde_json::from_slice(bytes)?;
    let version = probe.version.unwrap_or_default();
    if version != FORMAT_VERSION {
        return Err(ImportError::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let archive: Archive = serde_json::from_slice(bytes)?;
    tracing::debug!(
        sessions = archive.log.sessions.len(),
        messages = archive.message_count(),
        "parsed archive"
    );
    Ok(archive)
}

/// Reads and parses an archive file.
pub fn import_file(path: &Path) -> Result<Archive, ImportError> {
    let bytes = fs::read(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    import_archive(&bytes)
}

/// Projects an archive into internal session and message records.
///
/// Timestamps are reformatted to whole-second RFC 3339, message counts are
/// recomputed from the message lists, tool content gets its marker prefix
/// back and empty content parts are dropped.
pub fn to_records(archive: &Archive) -> (Vec<SessionRecord>, MessagesBySession) {
    let mut sessions = Vec::with_capacity(archive.log.sessions.len());
    let mut messages = MessagesBySession::with_capacity(archive.log.sessions.len());

    for session in &archive.log.sessions {
        sessions.push(session_record(session));
        messages.insert(
            session.id.clone(),
            session.messages.iter().map(message_record).collect(),
        );
    }

    (sessions, messages)
}

impl Archive {
    /// See [`to_records`].
    pub fn to_records(&self) -> (Vec<SessionRecord>, MessagesBySession) {
        to_records(self)
    }
}

fn session_record(session: &Session) -> SessionRecord {
    let message_count = i64::try_from(session.messages.len()).unwrap_or(i64::MAX);

    let metadata = if session.metadata.is_empty() {
        None
    } else {
        let mut metadata = session.metadata.clone();
        if metadata.contains_key(MESSAGE_COUNT_KEY) {
            metadata.insert(MESSAGE_COUNT_KEY.to_string(), message_count.into());
        }
        serde_json::to_string(&metadata).ok()
    };

    SessionRecord {
        id: session.id.clone(),
        title: session.title.clone(),
        created_at: session.started_at.as_ref().map(format_record_time),
        message_count: Some(message_count),
        metadata,
    }
}

fn message_record(message: &Message) -> MessageRecord {
    MessageRecord {
        id: message.id.clone(),
        role: message
            .role
            .map(|role| role.as_str().to_string())
            .unwrap_or_default(),
        parts: message.content.iter().filter_map(flatten_content).collect(),
        model: message.model.clone(),
        provider: message.provider.clone(),
        created_at: message.timestamp.as_ref().map(format_record_time),
    }
}

fn flatten_content(content: &Content) -> Option<MessagePart> {
    let text = content.text();
    if text.is_empty() {
        return None;
    }
    Some(MessagePart::tagged(
        content.kind,
        apply_marker(content.kind, text),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use insta::assert_snapshot;

    use crate::export::export_archive;
    use crate::format::ContentType;

    fn archive_json(sessions: &str) -> String {
        format!(
            r#"{{"version":"1.0","creator":{{"name":"x"}},"log":{{"version":"1.0","creator":{{"name":"x"}},"sessions":{sessions}}}}}"#
        )
    }

    #[test]
    fn tool_call_content_gets_marker_prefix() {
        let json = archive_json(
            r#"[{"id":"s1","messages":[{"id":"m1","role":"assistant","content":[{"type":"tool_call","text":"ls -la"}]}]}]"#,
        );
        let archive = import_archive(json.as_bytes()).unwrap();
        let (_, messages) = archive.to_records();

        let parts = &messages["s1"][0].parts;
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].text, "🔧 ls -la");
        assert_eq!(parts[0].kind, Some(ContentType::ToolCall));
    }

    #[test]
    fn existing_markers_are_not_doubled() {
        let json = archive_json(
            r#"[{"id":"s1","messages":[{"id":"m1","role":"tool","content":[
                {"type":"tool_call","text":"🔧 Tool call: bash"},
                {"type":"tool_result","text":"📋 Tool result:\nok"}
            ]}]}]"#,
        );
        let (_, messages) = import_archive(json.as_bytes()).unwrap().to_records();

        let texts: Vec<_> = messages["s1"][0].texts().collect();
        assert_eq!(texts, vec!["🔧 Tool call: bash", "📋 Tool result:\nok"]);
    }

    #[test]
    fn empty_content_is_dropped() {
        let json = archive_json(
            r#"[{"id":"s1","messages":[{"id":"m1","role":"user","content":[
                {"type":"text","text":""},
                {"type":"image","mimeType":"image/png"},
                {"type":"text","text":"hello"}
            ]}]}]"#,
        );
        let (_, messages) = import_archive(json.as_bytes()).unwrap().to_records();
        let texts: Vec<_> = messages["s1"][0].texts().collect();
        assert_eq!(texts, vec!["hello"]);
    }

    #[test]
    fn version_gate_is_distinct_from_malformed_input() {
        let newer = archive_json("[]").replacen("\"1.0\"", "\"2.0\"", 1);
        let err = import_archive(newer.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedVersion { .. }));
        assert_snapshot!(err.to_string(), @r#"unsupported version: "2.0" (expected: 1.0)"#);

        let err = import_archive(b"{\"version\": \"1.0\",").unwrap_err();
        assert!(matches!(err, ImportError::Malformed(_)));

        let err = import_archive(br#"{"creator":{"name":"x"}}"#).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedVersion { ref found, .. } if found.is_empty()));
    }

    #[test]
    fn schema_mismatch_is_malformed() {
        let json = archive_json(r#"[{"id":"s1","messages":"nope"}]"#);
        let err = import_archive(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Malformed(_)));
    }

    #[test]
    fn unknown_role_is_malformed_but_missing_role_is_kept_for_validation() {
        let json = archive_json(
            r#"[{"id":"s1","messages":[{"id":"m1","role":"narrator","content":[{"type":"text","text":"x"}]}]}]"#,
        );
        assert!(matches!(
            import_archive(json.as_bytes()),
            Err(ImportError::Malformed(_))
        ));

        let json = archive_json(
            r#"[{"id":"s1","messages":[{"id":"m1","role":"","content":[{"type":"text","text":"x"}]}]}]"#,
        );
        let archive = import_archive(json.as_bytes()).unwrap();
        assert_snapshot!(
            archive.validate().unwrap_err().to_string(),
            @"session s1, message m1: missing role"
        );
    }

    #[test]
    fn session_record_recomputes_count_and_reformats_time() {
        let json = archive_json(
            r#"[{"id":"s1","title":"Demo","startedAt":"2024-01-01T10:00:00.123+02:00",
                 "metadata":{"message_count":99,"source":"crush"},
                 "messages":[{"id":"m1","role":"user","timestamp":"2024-01-01T08:05:00Z","content":[{"type":"text","text":"x"}]}]}]"#,
        );
        let (sessions, messages) = import_archive(json.as_bytes()).unwrap().to_records();

        let session = &sessions[0];
        assert_eq!(session.title.as_deref(), Some("Demo"));
        assert_eq!(session.created_at.as_deref(), Some("2024-01-01T08:00:00Z"));
        assert_eq!(session.message_count, Some(1));
        assert_snapshot!(
            session.metadata.as_deref().unwrap_or_default(),
            @r#"{"message_count":1,"source":"crush"}"#
        );
        assert_eq!(
            messages["s1"][0].created_at.as_deref(),
            Some("2024-01-01T08:05:00Z")
        );
    }

    #[test]
    fn out_of_range_epoch_start_is_absent() {
        let json = archive_json(
            r#"[{"id":"s1","startedAt":"-9223372036854775808",
                 "messages":[{"id":"m1","role":"user","timestamp":"-9223372036854775808","content":[{"type":"text","text":"x"}]}]}]"#,
        );
        let archive = import_archive(json.as_bytes()).unwrap();
        assert_eq!(archive.sessions()[0].started_at, None);

        let (sessions, messages) = archive.to_records();
        assert_eq!(sessions[0].created_at, None);
        assert_eq!(messages["s1"][0].created_at, None);
    }

    #[test]
    fn import_file_reports_path() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("missing.aics.json");
        let err = import_file(&missing).unwrap_err();
        assert!(matches!(err, ImportError::Io { ref path, .. } if path == &missing));
    }

    #[test]
    fn records_survive_an_export_import_round_trip() {
        let sessions = vec![SessionRecord {
            id: "s1".to_string(),
            title: Some("Refactor".to_string()),
            created_at: Some("2024-01-01 08:00:00".to_string()),
            message_count: None,
            metadata: Some("crush".to_string()),
        }];
        let originals = vec![
            MessageRecord {
                id: "m1".to_string(),
                role: "user".to_string(),
                parts: vec![MessagePart::plain("please list files")],
                model: None,
                provider: None,
                created_at: Some("1704099600".to_string()),
            },
            MessageRecord {
                id: "m2".to_string(),
                role: "assistant".to_string(),
                parts: vec![
                    MessagePart::plain("🔧 Tool call: bash"),
                    MessagePart::plain(""),
                    MessagePart::plain("📋 Tool result:\nCargo.toml"),
                ],
                model: Some("claude-3-opus".to_string()),
                provider: Some("anthropic".to_string()),
                created_at: Some("2024-01-01T09:00:30Z".to_string()),
            },
        ];
        let by_session = HashMap::from([("s1".to_string(), originals.clone())]);

        let archive = export_archive(&sessions, &by_session, "Crush").unwrap();
        let bytes = archive.to_json_compact().unwrap();
        let (imported_sessions, imported) = import_archive(bytes.as_bytes())
            .unwrap()
            .to_records();

        assert_eq!(imported_sessions[0].created_at.as_deref(), Some("2024-01-01T08:00:00Z"));
        assert_eq!(imported_sessions[0].message_count, Some(2));

        let restored = &imported["s1"];
        assert_eq!(restored.len(), originals.len());
        for (before, after) in originals.iter().zip(restored) {
            assert_eq!(after.id, before.id);
            assert_eq!(after.role, before.role);
            assert_eq!(after.model, before.model);
            assert_eq!(after.provider, before.provider);
            assert_eq!(
                after.parts.len(),
                before.texts().filter(|t| !t.is_empty()).count()
            );
        }
        assert_eq!(restored[0].created_at.as_deref(), Some("2024-01-01T09:00:00Z"));
        assert_eq!(restored[1].created_at.as_deref(), Some("2024-01-01T09:00:30Z"));
        assert_eq!(restored[1].parts[1].text, "📋 Tool result:\nCargo.toml");
    }
}
