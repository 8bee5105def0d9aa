//! Rendering sessions as Markdown or HTML documents.

mod html;
mod markdown;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::Utc;
use cse_core::record::{MessageRecord, SessionRecord};
use cse_core::timestamp::parse_optional;
use regex::Regex;

pub use html::render_html;
pub use markdown::render_markdown;

static SLUG_STRIP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\-\s_]+").unwrap());
static SLUG_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_]+").unwrap());

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    #[default]
    Markdown,
    Html,
}

impl RenderFormat {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
        }
    }

    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
        }
    }

    /// Renders one session with its messages.
    pub fn render(&self, session: &SessionRecord, messages: &[MessageRecord]) -> String {
        match self {
            Self::Markdown => render_markdown(session, messages),
            Self::Html => render_html(session, messages),
        }
    }

    /// File name for a rendered session: `<YYYY-MM-DD_HH-MM>_<slug>.<ext>`.
    ///
    /// The prefix is the session's creation time, or now when unknown.
    pub fn filename(&self, session: &SessionRecord) -> String {
        let created = parse_optional(session.created_at.as_deref()).unwrap_or_else(Utc::now);
        format!(
            "{}_{}.{}",
            created.format("%Y-%m-%d_%H-%M"),
            session_slug(session),
            self.extension()
        )
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Error type for format names outside `markdown | md | html`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid format: {} (supported: markdown, html, md)",
            self.0
        )
    }
}

impl std::error::Error for UnknownFormat {}

/// Lowercase, hyphen-separated, ASCII alphanumeric slug; `untitled` when
/// nothing survives.
pub fn slugify(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let stripped = SLUG_STRIP.replace_all(&lower, "");
    let slug = SLUG_SEPARATORS.replace_all(&stripped, "-");
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.into_owned()
    }
}

fn session_slug(session: &SessionRecord) -> String {
    match session.title.as_deref() {
        Some(title) if !title.is_empty() => slugify(title),
        _ => {
            let short: String = session.id.chars().take(8).collect();
            slugify(&format!("session-{short}"))
        }
    }
}

/// Formats a record timestamp with `pattern` in UTC.
///
/// Unparseable values are shown verbatim; absent values as an empty string.
fn display_time(raw: Option<&str>, pattern: &str) -> String {
    match raw.filter(|s| !s.is_empty()) {
        None => String::new(),
        Some(s) => parse_optional(Some(s))
            .map_or_else(|| s.to_string(), |dt| dt.format(pattern).to_string()),
    }
}

/// `model/provider`, whichever are present.
fn model_info(message: &MessageRecord) -> Option<String> {
    let parts: Vec<&str> = [message.model.as_deref(), message.provider.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Session metadata entries when the record's metadata is a JSON object.
fn metadata_entries(session: &SessionRecord) -> Vec<(String, serde_json::Value)> {
    session
        .metadata
        .as_deref()
        .and_then(|raw| serde_json::from_str::<serde_json::Map<_, _>>(raw).ok())
        .map(|map| map.into_iter().collect())
        .unwrap_or_default()
}
