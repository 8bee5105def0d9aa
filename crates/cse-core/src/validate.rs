//! Structural validation of AICS archives.

use thiserror::Error;

use crate::format::{Archive, FORMAT_VERSION};

/// The first structural rule an archive violates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing version field")]
    MissingVersion,

    #[error("unsupported version: {found} (expected: {expected})")]
    UnsupportedVersion {
        found: String,
        expected: &'static str,
    },

    #[error("missing creator name")]
    MissingCreatorName,

    #[error("archive contains no sessions")]
    NoSessions,

    #[error("session {index}: missing ID")]
    MissingSessionId { index: usize },

    #[error("session {session_id}: no messages")]
    NoMessages { session_id: String },

    #[error("session {session_id}, message {index}: missing ID")]
    MissingMessageId { session_id: String, index: usize },

    #[error("session {session_id}, message {message_id}: missing role")]
    MissingRole {
        session_id: String,
        message_id: String,
    },

    #[error("session {session_id}, message {message_id}: no content")]
    NoContent {
        session_id: String,
        message_id: String,
    },
}

/// Checks an archive against the AICS structural rules.
///
/// Rules are checked in a fixed order (version, creator, sessions, then each
/// session and its messages) and the first violation is returned. The archive
/// is never modified.
pub fn validate(archive: &Archive) -> Result<(), ValidationError> {
    if archive.version.is_empty() {
        return Err(ValidationError::MissingVersion);
    }
    if archive.version != FORMAT_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            found: archive.version.clone(),
            expected: FORMAT_VERSION,
        });
    }
    if archive.creator.name.is_empty() {
        return Err(ValidationError::MissingCreatorName);
    }
    if archive.log.sessions.is_empty() {
        return Err(ValidationError::NoSessions);
    }

    for (index, session) in archive.log.sessions.iter().enumerate() {
        if session.id.is_empty() {
            return Err(ValidationError::MissingSessionId { index });
        }
        if session.messages.is_empty() {
            return Err(ValidationError::NoMessages {
                session_id: session.id.clone(),
            });
        }

        for (index, message) in session.messages.iter().enumerate() {
            if message.id.is_empty() {
                return Err(ValidationError::MissingMessageId {
                    session_id: session.id.clone(),
                    index,
                });
            }
            if message.role.is_none() {
                return Err(ValidationError::MissingRole {
                    session_id: session.id.clone(),
                    message_id: message.id.clone(),
                });
            }
            if message.content.is_empty() {
                return Err(ValidationError::NoContent {
                    session_id: session.id.clone(),
                    message_id: message.id.clone(),
                });
            }
        }
    }

    Ok(())
}

impl Archive {
    /// See [`validate`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(self)
    }
}
