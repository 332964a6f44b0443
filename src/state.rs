//! UI-agnostic state types
//!
//! These are shared by the message pipeline, the readiness poller and the
//! terminal UI, and don't depend on any specific UI framework.

use std::fmt;

/// A chat message in the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    /// Plain text for user messages, markdown markup for AI messages
    pub content: String,
    /// Error notices are drawn differently from regular answers
    pub is_error: bool,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Ai,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            is_error: false,
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            content: content.into(),
            is_error: true,
        }
    }
}

/// Backend readiness as seen by the last completed poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Downloading { model: String },
    Unreachable,
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Ready => write!(f, "ready"),
            Readiness::Downloading { model } => write!(f, "downloading {}", model),
            Readiness::Unreachable => write!(f, "unreachable"),
        }
    }
}
