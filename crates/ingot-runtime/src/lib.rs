//! # Ingot Runtime
//!
//! The orchestration layer of the Ingot bot framework.
//!
//! This crate provides:
//! - The bot instance ([`Ingot`]) that routes inbound messages through the
//!   middleware pipeline, the event bus and the command system
//! - Statically linked plugins ([`Plugin`])
//! - Configuration loading with figment ([`ConfigLoader`], [`IngotConfig`])
//! - Logging setup with tracing-subscriber ([`LoggingBuilder`])
//!
//! ```rust,ignore
//! use ingot_runtime::{Ingot, Plugin};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Loads conf/ingot.toml if present and initializes logging
//!     let ingot = Arc::new(Ingot::new());
//!     ingot.use_plugin(EchoPlugin::default());
//!
//!     // Adapters call `ingot.handle_message(msg)` for every inbound message
//!     tokio::spawn(my_adapter(Arc::clone(&ingot)));
//!
//!     // Run until Ctrl+C
//!     ingot.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingot;
pub mod logging;
pub mod plugin;

pub use config::{ConfigError, ConfigLoader, ConfigResult, IngotConfig, LoggingConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use ingot::{COMMAND_EVENT, EventHandler, Ingot, IngotBuilder, MESSAGE_EVENT};
pub use logging::{LoggingBuilder, SpanEvents};
pub use plugin::{BoxedPlugin, Plugin};

// Re-export tracing for use by plugins
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for plugin code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
