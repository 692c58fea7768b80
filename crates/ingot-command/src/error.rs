//! Error types for command registration and dispatch.

use ingot_core::BoxError;
use thiserror::Error;

/// Errors produced while building or dispatching commands.
///
/// Dispatch failures reach the chat as a plain-text reply, except
/// [`Unmatched`](Self::Unmatched), which the dispatcher swallows.
/// Registration-time variants are returned to the caller of
/// [`CommandBuilder::build`].
///
/// [`CommandBuilder::build`]: crate::CommandBuilder::build
#[derive(Debug, Error)]
pub enum CommandError {
    /// Malformed grammar string, option spec or type name.
    #[error("invalid format: {0}")]
    Format(String),

    /// The text does not name this command.
    #[error("unmatched command")]
    Unmatched,

    /// The text names this command but its arguments are wrong.
    #[error("{0}")]
    Validation(String),

    /// An alias pattern failed to compile.
    #[error("invalid alias pattern '{pattern}': {source}")]
    AliasCompile {
        pattern: String,
        source: regex::Error,
    },

    /// The command action returned an error.
    #[error("command handler failed: {0}")]
    Handler(BoxError),
}

impl CommandError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Text sent back to the conversation for this failure. A handler error
    /// is replied with its own message.
    pub fn reply_text(&self) -> Option<String> {
        match self {
            Self::Unmatched => None,
            Self::Handler(e) => Some(e.to_string()),
            other => Some(other.to_string()),
        }
    }
}

/// Result type for command operations.
pub type CommandResult<T> = Result<T, CommandError>;
