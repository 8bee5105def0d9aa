//! Prefix-marker classification of flattened message text.
//!
//! Some sources flatten tool activity into plain text and mark it with an
//! emoji prefix. This is a compatibility shim for those sources: a fragment
//! that genuinely starts with one of the markers is misclassified. Callers
//! that know the real kind should carry it explicitly
//! (see [`crate::record::MessagePart`]).

use crate::format::ContentType;

/// Prefix of a flattened tool invocation.
pub const TOOL_CALL_MARKER: &str = "🔧";

/// Prefix of a flattened tool result.
pub const TOOL_RESULT_MARKER: &str = "📋";

/// Classifies a flattened text fragment by its marker prefix.
///
/// Fragments without a marker are plain text.
pub fn classify(fragment: &str) -> ContentType {
    if fragment.starts_with(TOOL_CALL_MARKER) {
        ContentType::ToolCall
    } else if fragment.starts_with(TOOL_RESULT_MARKER) {
        ContentType::ToolResult
    } else {
        ContentType::Text
    }
}

/// Returns the marker used to flatten content of `kind`, if any.
pub const fn marker_for(kind: ContentType) -> Option<&'static str> {
    match kind {
        ContentType::ToolCall => Some(TOOL_CALL_MARKER),
        ContentType::ToolResult => Some(TOOL_RESULT_MARKER),
        ContentType::Text | ContentType::Code | ContentType::Image => None,
    }
}

/// Flattens `text` for `kind`, prefixing the marker unless already present.
pub fn apply_marker(kind: ContentType, text: &str) -> String {
    match marker_for(kind) {
        Some(marker) if !text.starts_with(marker) => format!("{marker} {text}"),
        _ => text.to_string(),
    }
}

/// Whether a flattened fragment carries either tool marker.
pub fn is_tool_fragment(fragment: &str) -> bool {
    classify(fragment) != ContentType::Text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_prefix() {
        assert_eq!(classify("🔧 Tool call: bash"), ContentType::ToolCall);
        assert_eq!(classify("📋 Tool result:\nok"), ContentType::ToolResult);
        assert_eq!(classify("plain words"), ContentType::Text);
        assert_eq!(classify(""), ContentType::Text);
    }

    #[test]
    fn marker_in_the_middle_is_plain_text() {
        assert_eq!(classify("see 🔧 above"), ContentType::Text);
    }

    #[test]
    fn apply_marker_prefixes_tool_content() {
        assert_eq!(apply_marker(ContentType::ToolCall, "ls -la"), "🔧 ls -la");
        assert_eq!(apply_marker(ContentType::ToolResult, "done"), "📋 done");
        assert_eq!(apply_marker(ContentType::Code, "fn main() {}"), "fn main() {}");
    }

    #[test]
    fn apply_marker_never_doubles_prefix() {
        let once = apply_marker(ContentType::ToolCall, "ls -la");
        assert_eq!(apply_marker(ContentType::ToolCall, &once), once);
        assert_eq!(apply_marker(ContentType::ToolResult, "📋result"), "📋result");
    }

    #[test]
    fn tool_fragment_detection() {
        assert!(is_tool_fragment("🔧 Tool call: grep"));
        assert!(!is_tool_fragment("hello"));
    }
}
