//! Markdown output with a YAML frontmatter header.

use std::fmt::Write;

use cse_core::record::{MessageRecord, SessionRecord};
use cse_core::timestamp::{format_rfc3339, parse_timestamp};

use super::{display_time, metadata_entries, model_info};

/// Renders a session as Markdown.
pub fn render_markdown(session: &SessionRecord, messages: &[MessageRecord]) -> String {
    let mut out = String::new();

    out.push_str("---\n");
    writeln!(out, "title: \"{}\"", yaml_escape(&session.display_title())).unwrap();
    writeln!(out, "session_id: {}", session.id).unwrap();
    if let Some(created) = session.created_at.as_deref().filter(|s| !s.is_empty()) {
        let iso = parse_timestamp(created).map_or_else(|| created.to_string(), |dt| format_rfc3339(&dt));
        writeln!(out, "created_at: {iso}").unwrap();
    }
    if let Some(count) = session.message_count {
        writeln!(out, "message_count: {count}").unwrap();
    }
    let metadata = metadata_entries(session);
    if !metadata.is_empty() {
        out.push_str("metadata:\n");
        for (key, value) in &metadata {
            writeln!(out, "  {key}: {value}").unwrap();
        }
    }
    out.push_str("---\n\n");

    for message in messages {
        let time = display_time(message.created_at.as_deref(), "%Y-%m-%d %H:%M");
        write!(out, "## {} — {time}", message.role).unwrap();
        if let Some(info) = model_info(message) {
            write!(out, " ({info})").unwrap();
        }
        out.push_str("\n\n<div>\n");
        for text in message.texts() {
            out.push_str(text);
            out.push('\n');
        }
        out.push_str("</div>\n\n");
    }

    out
}

/// Keeps the title on one line inside a double-quoted YAML scalar.
fn yaml_escape(s: &str) -> String {
    s.replace('\n', " ").replace('"', "'")
}
