//! # Ingot Command
//!
//! Declarative commands for the Ingot bot framework.
//!
//! A command is described by a compact grammar string and turned into a
//! [`Registry`] by the [`CommandBuilder`]:
//!
//! ```rust,ignore
//! CommandBuilder::new("echo <content:text>", system.clone())
//!     .option_spec("-u [upper:bool]")
//!     .action(|ctx| async move {
//!         let mut text = ctx.arg("content").unwrap_or_default().to_string();
//!         if ctx.option_bool("upper") {
//!             text = text.to_uppercase();
//!         }
//!         ctx.reply_text(&text).await?;
//!         Ok(())
//!     })
//!     .build()?;
//! ```
//!
//! ## Components
//!
//! - **Input types**: token validators ([`InputType`], [`register_input_type`])
//! - **Schemas**: the grammar and its parser ([`Schema`], [`SchemaArgument`],
//!   [`SchemaOption`])
//! - **Registries**: schema + action + aliases + sub-commands ([`Registry`],
//!   [`Alias`]), including the dispatch walk and the alias matcher
//! - **System**: the set of registered roots ([`CommandSystem`])
//!
//! ## Dispatch
//!
//! ```text
//! "dice 20" ──▶ CommandContext ──▶ CommandSystem::emit
//!                                    ├─▶ Registry "dice"  ──▶ action(ctx)
//!                                    └─▶ Registry "echo"  ──▶ (unmatched)
//! ```
//!
//! Validation and handler failures are replied to the conversation as plain
//! text. Names that do not match are ignored silently.

pub mod builder;
pub mod context;
pub mod error;
pub mod input;
pub mod registry;
pub mod schema;
pub mod split;
pub mod system;

pub use builder::CommandBuilder;
pub use context::CommandContext;
pub use error::{CommandError, CommandResult};
pub use input::{InputType, parse_bool, parse_float, parse_int, register_input_type};
pub use registry::{Alias, AliasTransform, CommandHandler, Registry, command_handler};
pub use schema::{Schema, SchemaArgument, SchemaOption};
pub use split::shell_split;
pub use system::CommandSystem;
