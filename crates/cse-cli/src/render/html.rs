//! Self-contained HTML output.

use std::fmt::Write;

use cse_core::classify::is_tool_fragment;
use cse_core::record::{MessageRecord, SessionRecord};
use cse_core::timestamp::parse_optional;

use super::{display_time, metadata_entries, model_info};

const STYLE: &str = r"
    body { margin: 0; background: #f5f6fa; color: #1f2330;
           font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; }
    .container { max-width: 1000px; margin: 0 auto; padding: 24px; }
    .header h1 { margin: 0 0 16px; font-size: 1.6rem; }
    .session-info { background: #fff; border-radius: 8px; padding: 16px; margin-bottom: 24px; }
    .session-info h2 { margin: 0 0 12px; font-size: 1.1rem; }
    .info-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 12px; }
    .info-label { font-size: 0.75rem; text-transform: uppercase; color: #6b7080; }
    .info-value { font-family: ui-monospace, monospace; word-break: break-all; }
    .message { display: grid; grid-template-columns: 160px 1fr; background: #fff;
               border-radius: 8px; margin-bottom: 12px; overflow: hidden; }
    .message-sidebar { padding: 12px; border-right: 1px solid #eceef3; font-size: 0.8rem; }
    .message-sidebar.user { background: #eef4ff; }
    .message-sidebar.assistant { background: #f1fbf4; }
    .message-sidebar.tool, .message-sidebar.system { background: #fbf7ee; }
    .role-badge { font-weight: 600; margin-bottom: 4px; }
    .message-time a { color: inherit; text-decoration: none; }
    .message-model { color: #6b7080; margin-top: 4px; word-break: break-all; }
    .message-content { padding: 12px 16px; }
    .message-part { white-space: pre-wrap; margin-bottom: 8px; }
    .message-part.tool { font-family: ui-monospace, monospace; font-size: 0.85rem;
                         background: #f6f7f9; border-radius: 4px; padding: 8px; }
    .date-separator { text-align: center; color: #6b7080; margin: 20px 0; font-size: 0.85rem; }
    @media (max-width: 700px) {
        .message { grid-template-columns: 1fr; }
        .message-sidebar { border-right: none; border-bottom: 1px solid #eceef3; }
    }
";

/// Renders a session as a standalone HTML page.
pub fn render_html(session: &SessionRecord, messages: &[MessageRecord]) -> String {
    let title = escape(&session.display_title());
    let mut out = String::new();

    write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <div class=\"container\">\n<div class=\"header\"><h1>{title}</h1></div>\n"
    )
    .unwrap();

    write_session_info(&mut out, session);

    out.push_str("<div class=\"conversation\">\n");
    let mut last_date = None;
    for (index, message) in messages.iter().enumerate() {
        if let Some(time) = parse_optional(message.created_at.as_deref()) {
            let date = time.date_naive();
            if last_date != Some(date) {
                if index > 0 {
                    writeln!(
                        out,
                        "<div class=\"date-separator\">{}</div>",
                        date.format("%A, %B %-d, %Y")
                    )
                    .unwrap();
                }
                last_date = Some(date);
            }
        }
        write_message(&mut out, message, index);
    }
    out.push_str("</div>\n</div>\n</body>\n</html>\n");

    out
}

fn write_session_info(out: &mut String, session: &SessionRecord) {
    out.push_str("<div class=\"session-info\">\n<h2>Session Information</h2>\n<div class=\"info-grid\">\n");
    write_info_item(out, "Session ID", &session.id);
    if session.created_at.is_some() {
        let created = display_time(session.created_at.as_deref(), "%Y-%m-%d %H:%M");
        write_info_item(out, "Created", &created);
    }
    if let Some(count) = session.message_count {
        write_info_item(out, "Messages", &count.to_string());
    }
    for (key, value) in metadata_entries(session) {
        let value = match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        write_info_item(out, &key, &value);
    }
    out.push_str("</div>\n</div>\n");
}

fn write_info_item(out: &mut String, label: &str, value: &str) {
    writeln!(
        out,
        "<div class=\"info-item\"><div class=\"info-label\">{}</div><div class=\"info-value\">{}</div></div>",
        escape(label),
        escape(value)
    )
    .unwrap();
}

fn write_message(out: &mut String, message: &MessageRecord, index: usize) {
    let anchor = format!("msg-{}", index + 1);
    let role = escape(&message.role);
    let time = match display_time(message.created_at.as_deref(), "%H:%M:%S") {
        t if t.is_empty() => "Unknown".to_string(),
        t => t,
    };

    write!(
        out,
        "<div class=\"message\" id=\"{anchor}\">\n<div class=\"message-sidebar {role}\">\n\
         <div class=\"role-badge\">{}</div>\n\
         <div class=\"message-time\"><a href=\"#{anchor}\">{}</a></div>\n",
        role_label(&message.role),
        escape(&time)
    )
    .unwrap();
    if let Some(info) = model_info(message) {
        writeln!(out, "<div class=\"message-model\">{}</div>", escape(&info)).unwrap();
    }
    out.push_str("</div>\n<div class=\"message-content\">\n");
    for text in message.texts() {
        let class = if is_tool_fragment(text) {
            "message-part tool"
        } else {
            "message-part"
        };
        writeln!(out, "<div class=\"{class}\">{}</div>", escape(text)).unwrap();
    }
    out.push_str("</div>\n</div>\n");
}

fn role_label(role: &str) -> String {
    let mut chars = role.chars();
    let label = chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    });
    escape(&label)
}

/// Escapes text for element content and double-quoted attributes.
fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
