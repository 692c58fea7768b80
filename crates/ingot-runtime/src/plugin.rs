//! Statically linked plugins.
//!
//! A plugin is a unit of bot behavior: it registers commands, event handlers
//! and middlewares on [`init`](Plugin::init) and undoes them on
//! [`release`](Plugin::release). Plugins are handed to
//! [`Ingot::use_plugin`] before the instance starts.
//!
//! ```rust,ignore
//! struct Ping {
//!     registrations: Mutex<Vec<Disposer>>,
//! }
//!
//! #[async_trait]
//! impl Plugin for Ping {
//!     fn name(&self) -> &str {
//!         "ping"
//!     }
//!
//!     async fn init(&self, ingot: &Ingot) -> Result<(), BoxError> {
//!         let disposer = ingot
//!             .command("ping")
//!             .alias_pattern("^ping$")
//!             .action(|ctx| async move {
//!                 ctx.reply_text("pong").await?;
//!                 Ok(())
//!             })
//!             .build()?;
//!         self.registrations.lock().push(disposer);
//!         Ok(())
//!     }
//!
//!     async fn release(&self, _ingot: &Ingot) -> Result<(), BoxError> {
//!         self.registrations.lock().drain(..).for_each(|d| d.dispose());
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use ingot_core::BoxError;

use crate::ingot::Ingot;

/// A unit of bot behavior registered at startup.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Registers the plugin's commands, handlers and middlewares.
    ///
    /// A plugin whose `init` fails is skipped; the others still start.
    async fn init(&self, ingot: &Ingot) -> Result<(), BoxError>;

    /// Removes what `init` registered. Called once on shutdown for every
    /// plugin whose `init` succeeded.
    async fn release(&self, _ingot: &Ingot) -> Result<(), BoxError> {
        Ok(())
    }
}

/// A shared plugin trait object.
pub type BoxedPlugin = Arc<dyn Plugin>;
