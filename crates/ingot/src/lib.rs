//! # Ingot
//!
//! A chat-bot middleware framework: protocol adapters hand inbound messages
//! to one [`Ingot`](runtime::Ingot) instance, which runs them through onion
//! middlewares, publishes them as events and dispatches declarative commands.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌──────────────┐     ┌──────────────────────┐
//! │   Adapter   │────▶│ Middleware │────▶│ "message"    │────▶│ Alias matcher        │
//! │ (Message    │     │  Pipeline  │     │  event       │     ├──────────────────────┤
//! │  Context)   │     └────────────┘     └──────────────┘     │ "/" prefix?          │
//! └─────────────┘                                             │  ├▶ "command" event  │
//!                                                             │  └▶ Command dispatch │
//!                                                             └──────────────────────┘
//! ```
//!
//! - **Core**: message model, event bus, middleware pipeline, disposers
//! - **Command**: grammar strings, schemas, registries, aliases
//! - **Runtime**: the bot instance, plugins, configuration, logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ingot::prelude::*;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Plugin for Echo {
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     async fn init(&self, ingot: &Ingot) -> Result<(), BoxError> {
//!         ingot
//!             .command("echo <content:text>")
//!             .action(|ctx| async move {
//!                 ctx.reply_text(ctx.arg("content").unwrap_or_default()).await?;
//!                 Ok(())
//!             })
//!             .build()?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ingot = Arc::new(Ingot::new());
//!     ingot.use_plugin(Echo);
//!     ingot.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use ingot_command as command;
pub use ingot_core as core;
pub use ingot_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use ingot::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use ingot_runtime::{EventHandler, Ingot, Plugin, RuntimeError};

    // Commands
    pub use ingot_command::{CommandBuilder, CommandContext, CommandError, InputType};

    // Core model and pipeline types
    pub use ingot_core::{
        BaseMessage, BotContext, BoxError, Disposer, EventPayload, LoginStatus, MessageBuilder,
        MessageContext, MessageElement, MessageKind, Next, ReplyError, ReplyResult, Sender,
        async_trait,
    };

    // Logging macros
    pub use ingot_runtime::prelude::*;
}
