//! Runtime error types.

use ingot_command::CommandError;
use ingot_core::{BoxError, EventError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while setting up or running an [`Ingot`](crate::Ingot).
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Command(#[from] CommandError),

    /// A plugin failed to initialize or release.
    #[error("Plugin '{name}' failed: {source}")]
    Plugin { name: String, source: BoxError },

    /// Listening for the shutdown signal failed.
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn plugin(name: impl Into<String>, source: BoxError) -> Self {
        Self::Plugin {
            name: name.into(),
            source,
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
