//! Core domain logic for the chat session explorer.
//!
//! This crate contains the AICS interchange format and the conversions
//! around it:
//! - Format: the archive → log → session → message → content tree
//! - Export/import: converting internal records to and from archives
//! - Validation: the structural rules an archive must satisfy
//! - Timestamps and content classification shared by both directions

pub mod classify;
pub mod export;
pub mod format;
pub mod import;
pub mod record;
pub mod timestamp;
pub mod validate;

pub use classify::{TOOL_CALL_MARKER, TOOL_RESULT_MARKER, apply_marker, classify};
pub use export::{
    ConversionError, ExportError, export_archive, export_session_to_file,
    export_sessions_individually, generate_session_id,
};
pub use format::{
    Archive, Content, ContentType, FORMAT_NAME, FORMAT_VERSION, Message, Metadata, Role,
    Session, UnknownRole,
};
pub use import::{ImportError, import_archive, import_file};
pub use record::{MessagePart, MessageRecord, MessagesBySession, SessionRecord};
pub use timestamp::{format_rfc3339, parse_timestamp};
pub use validate::{ValidationError, validate};
