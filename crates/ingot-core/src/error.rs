//! Unified error types for the Ingot core.
//!
//! Command-level errors (grammar, validation) are defined in `ingot-command`.

use thiserror::Error;

/// Boxed error returned by user callbacks (event handlers, middleware,
/// command actions).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Event Errors
// =============================================================================

/// Errors that can occur when subscribing to or emitting named events.
#[derive(Debug, Error)]
pub enum EventError {
    /// The event name was never registered on the bus.
    #[error("event '{name}' not found")]
    NotRegistered {
        /// The unknown event name.
        name: String,
    },

    /// A subscriber received a payload of an unexpected type.
    #[error("event payload mismatch: expected '{expected}'")]
    PayloadMismatch {
        /// Expected payload type name.
        expected: &'static str,
    },

    /// A subscriber returned an error; remaining subscribers were skipped.
    #[error("handler for event '{event}' failed: {source}")]
    Handler {
        /// The event being emitted.
        event: String,
        /// The error produced by the handler.
        source: BoxError,
    },
}

impl EventError {
    /// Creates a not-registered error.
    pub fn not_registered(name: impl Into<String>) -> Self {
        Self::NotRegistered { name: name.into() }
    }
}

// =============================================================================
// Reply Errors
// =============================================================================

/// Errors an adapter may report when sending a reply.
#[derive(Debug, Clone, Error)]
pub enum ReplyError {
    /// The underlying connection is not available.
    #[error("bot is not connected")]
    NotConnected,

    /// The platform rejected or failed to deliver the message.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The message contains elements the protocol cannot express.
    #[error("unsupported message element: {0}")]
    Unsupported(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for event bus operations.
pub type EventResult<T> = Result<T, EventError>;

/// Result type for replies.
pub type ReplyResult<T> = Result<T, ReplyError>;
