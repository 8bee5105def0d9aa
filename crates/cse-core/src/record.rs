//! Internal session and message records exchanged with providers and renderers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::classify::classify;
use crate::format::ContentType;

/// Messages of each session, keyed by session id.
pub type MessagesBySession = HashMap<String, Vec<MessageRecord>>;

/// A session as stored by a source tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub title: Option<String>,
    /// Creation time in whatever encoding the source uses.
    pub created_at: Option<String>,
    pub message_count: Option<i64>,
    /// Free-form provider metadata; a JSON object or a bare provider name.
    pub metadata: Option<String>,
}

impl SessionRecord {
    /// The title, or `Session <id>` when untitled.
    pub fn display_title(&self) -> String {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("Session {}", self.id),
        }
    }
}

/// A message with its body flattened into text fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub role: String,
    pub parts: Vec<MessagePart>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub created_at: Option<String>,
}

impl MessageRecord {
    /// Iterates over the flattened text of each part.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.text.as_str())
    }
}

/// One flattened fragment of a message body.
///
/// `kind` is set when the source knows what the fragment is; otherwise it is
/// inferred from the text's marker prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContentType>,
    pub text: String,
}

impl MessagePart {
    /// An untagged fragment whose kind will be inferred.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: None,
            text: text.into(),
        }
    }

    /// A fragment with a known kind.
    pub fn tagged(kind: ContentType, text: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            text: text.into(),
        }
    }

    /// The explicit kind, falling back to prefix classification.
    pub fn content_type(&self) -> ContentType {
        self.kind.unwrap_or_else(|| classify(&self.text))
    }
}
