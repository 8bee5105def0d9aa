//! Conversion of internal session records into AICS archives.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::format::{
    Archive, Browser, Content, Creator, FORMAT_VERSION, Log, Message, Metadata, Role, Session,
};
use crate::record::{MessagePart, MessageRecord, MessagesBySession, SessionRecord};
use crate::timestamp::parse_optional;

/// Name this tool writes into the archive's creator descriptor.
pub const CREATOR_NAME: &str = "crush-session-explorer";

/// Version this tool writes into the archive's creator descriptor.
pub const CREATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File extension of individually exported sessions.
pub const ARCHIVE_EXTENSION: &str = "aics.json";

/// Session metadata key holding the number of messages.
pub const MESSAGE_COUNT_KEY: &str = "message_count";

const CREATOR_COMMENT: &str = "Exported from a local chat session database";
const BROWSER_COMMENT: &str = "Original AI coding tool";

/// A source record that cannot be represented in AICS.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("message {message_id}: unknown role {role:?}")]
    UnknownRole { message_id: String, role: String },
}

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A session or one of its messages could not be converted.
    #[error("failed to convert session {session_id}: {source}")]
    Conversion {
        session_id: String,
        #[source]
        source: ConversionError,
    },
    /// Individually exported sessions are filed by start date.
    #[error("session {session_id} has no start time")]
    MissingStartTime { session_id: String },
    #[error("failed to serialize session {session_id}")]
    Serialize {
        session_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Builds one archive holding every session.
///
/// Session ids are preserved. The first session or message that fails to
/// convert aborts the export; partial archives are never returned.
pub fn export_archive(
    sessions: &[SessionRecord],
    messages: &MessagesBySession,
    tool_name: &str,
) -> Result<Archive, ExportError> {
    let converted = sessions
        .iter()
        .map(|record| convert_record(record, messages))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(sessions = converted.len(), tool = tool_name, "built archive");
    Ok(new_archive(tool_name, converted))
}

/// Wraps sessions in an archive stamped with this tool and `tool_name`.
pub fn new_archive(tool_name: &str, sessions: Vec<Session>) -> Archive {
    Archive {
        version: FORMAT_VERSION.to_string(),
        creator: Creator {
            name: CREATOR_NAME.to_string(),
            version: CREATOR_VERSION.to_string(),
            comment: Some(CREATOR_COMMENT.to_string()),
        },
        browser: Some(Browser {
            name: tool_name.to_string(),
            version: None,
            comment: Some(BROWSER_COMMENT.to_string()),
        }),
        log: Log {
            version: FORMAT_VERSION.to_string(),
            creator: Creator {
                name: CREATOR_NAME.to_string(),
                version: CREATOR_VERSION.to_string(),
                comment: None,
            },
            browser: Some(Browser {
                name: tool_name.to_string(),
                ..Browser::default()
            }),
            sessions,
            comment: None,
        },
    }
}

fn convert_record(
    record: &SessionRecord,
    messages: &MessagesBySession,
) -> Result<Session, ExportError> {
    let messages = messages.get(&record.id).map_or(&[][..], Vec::as_slice);
    convert_session(record, messages).map_err(|source| ExportError::Conversion {
        session_id: record.id.clone(),
        source,
    })
}

/// Converts a session record and its messages.
///
/// `startedAt` comes from the record's creation time; `updatedAt` starts there
/// and advances to each later message timestamp. Ties do not advance it and
/// unparseable timestamps are ignored.
pub fn convert_session(
    record: &SessionRecord,
    messages: &[MessageRecord],
) -> Result<Session, ConversionError> {
    let started_at = parse_optional(record.created_at.as_deref());
    let mut session = Session {
        id: record.id.clone(),
        title: record.title.clone().filter(|t| !t.is_empty()),
        started_at,
        updated_at: started_at,
        messages: Vec::with_capacity(messages.len()),
        ..Session::default()
    };

    for message in messages {
        let converted = convert_message(message)?;
        if converted
            .timestamp
            .is_some_and(|ts| session.updated_at.is_none_or(|current| ts > current))
        {
            session.updated_at = converted.timestamp;
        }
        session.messages.push(converted);
    }

    session.metadata = session_metadata(record, session.messages.len());
    Ok(session)
}

fn session_metadata(record: &SessionRecord, converted: usize) -> Metadata {
    let mut metadata = Metadata::new();

    if let Some(raw) = record.metadata.as_deref().filter(|m| !m.trim().is_empty()) {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => metadata.extend(map),
            _ => {
                metadata.insert("source".to_string(), Value::String(raw.to_string()));
            }
        }
    }

    let count = record
        .message_count
        .unwrap_or_else(|| i64::try_from(converted).unwrap_or(i64::MAX));
    metadata.insert(MESSAGE_COUNT_KEY.to_string(), Value::from(count));
    metadata
}

/// Converts one message record; each text fragment becomes one content part.
pub fn convert_message(record: &MessageRecord) -> Result<Message, ConversionError> {
    let role: Role = record
        .role
        .parse()
        .map_err(|_| ConversionError::UnknownRole {
            message_id: record.id.clone(),
            role: record.role.clone(),
        })?;

    Ok(Message {
        id: record.id.clone(),
        timestamp: parse_optional(record.created_at.as_deref()),
        role: Some(role),
        content: record.parts.iter().map(part_to_content).collect(),
        model: record.model.clone().filter(|m| !m.is_empty()),
        provider: record.provider.clone().filter(|p| !p.is_empty()),
        ..Message::default()
    })
}

fn part_to_content(part: &MessagePart) -> Content {
    let mut content = Content::new(part.content_type(), part.text.clone());
    if part.text.is_empty() {
        content.text = None;
    }
    content
}

/// Generates a time-ordered session id (UUID v7).
pub fn generate_session_id() -> String {
    Uuid::now_v7().to_string()
}

/// Directory an individually exported session is filed under:
/// `<base_dir>/YYYY/MM/DD`, from the session's start time.
pub fn session_dir(base_dir: &Path, session: &Session) -> Result<PathBuf, ExportError> {
    let started = session
        .started_at
        .ok_or_else(|| ExportError::MissingStartTime {
            session_id: session.id.clone(),
        })?;

    Ok(base_dir
        .join(started.format("%Y").to_string())
        .join(started.format("%m").to_string())
        .join(started.format("%d").to_string()))
}

/// Writes a single-session archive to `<base_dir>/YYYY/MM/DD/<id>.aics.json`.
pub fn export_session_to_file(
    session: &Session,
    base_dir: &Path,
    tool_name: &str,
) -> Result<PathBuf, ExportError> {
    let dir = session_dir(base_dir, session)?;
    fs::create_dir_all(&dir).map_err(|source| ExportError::Io {
        path: dir.clone(),
        source,
    })?;

    let archive = new_archive(tool_name, vec![session.clone()]);
    let json = archive
        .to_json_pretty()
        .map_err(|source| ExportError::Serialize {
            session_id: session.id.clone(),
            source,
        })?;

    let path = dir.join(format!("{}.{ARCHIVE_EXTENSION}", session.id));
    fs::write(&path, json).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Exports every session to its own date-partitioned file.
///
/// Each session gets a fresh UUID v7 id and is stamped with `client_id`. The
/// first failing session aborts the batch; files written before it stay on
/// disk.
pub fn export_sessions_individually(
    sessions: &[SessionRecord],
    messages: &MessagesBySession,
    base_dir: &Path,
    tool_name: &str,
    client_id: Option<&str>,
) -> Result<Vec<PathBuf>, ExportError> {
    let mut written = Vec::with_capacity(sessions.len());

    for record in sessions {
        let mut session = convert_record(record, messages)?;
        if session.started_at.is_none() {
            return Err(ExportError::MissingStartTime {
                session_id: record.id.clone(),
            });
        }

        session.id = generate_session_id();
        session.client_id = client_id.filter(|id| !id.is_empty()).map(str::to_string);

        let path = export_session_to_file(&session, base_dir, tool_name)?;
        tracing::debug!(
            source_id = %record.id,
            session_id = %session.id,
            path = %path.display(),
            "exported session"
        );
        written.push(path);
    }

    Ok(written)
}
