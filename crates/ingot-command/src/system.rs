//! The lock-guarded set of root registries.

use std::fmt;
use std::sync::Arc;

use ingot_core::{Disposer, MessageContext};
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::CommandContext;
use crate::error::CommandError;
use crate::registry::Registry;

/// Owns every registered command tree.
///
/// Registration and removal may happen at any time, including while messages
/// are being dispatched; each dispatch works on a snapshot taken under the
/// lock and iterated without it.
#[derive(Default)]
pub struct CommandSystem {
    roots: Arc<Mutex<Vec<(Uuid, Arc<Registry>)>>>,
}

impl CommandSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root registry. Dispose the handle to remove it again.
    pub fn register(&self, registry: Registry) -> Disposer {
        let id = Uuid::new_v4();
        debug!(command = %registry.name(), %id, "Registered command");
        self.roots.lock().push((id, Arc::new(registry)));

        let roots = Arc::downgrade(&self.roots);
        Disposer::new(move || {
            if let Some(roots) = roots.upgrade() {
                roots.lock().retain(|(entry, _)| *entry != id);
            }
        })
    }

    pub fn len(&self) -> usize {
        self.roots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the registered root commands, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.roots
            .lock()
            .iter()
            .map(|(_, r)| r.name().to_string())
            .collect()
    }

    /// Usage text of every root command, in registration order.
    pub fn usages(&self) -> Vec<String> {
        self.roots
            .lock()
            .iter()
            .map(|(_, r)| r.schema().usage())
            .collect()
    }

    fn snapshot(&self) -> Vec<Arc<Registry>> {
        self.roots.lock().iter().map(|(_, r)| Arc::clone(r)).collect()
    }

    /// Dispatches `ctx` to every root registry.
    ///
    /// Each root gets its own clone of `ctx`. An unmatched root is skipped
    /// silently; any other failure is replied to the conversation as plain
    /// text. Returns the number of roots whose action ran.
    pub async fn emit(&self, ctx: &CommandContext) -> usize {
        let mut handled = 0;
        for registry in self.snapshot() {
            let err = match registry.dispatch(ctx.clone()).await {
                Ok(()) => {
                    handled += 1;
                    continue;
                }
                Err(CommandError::Unmatched) => continue,
                Err(e) => e,
            };

            if matches!(err, CommandError::Handler(_)) {
                handled += 1;
                warn!(command = %registry.name(), error = %err, "Command failed");
            } else {
                debug!(command = %registry.name(), error = %err, "Command validation failed");
            }
            if let Some(reply) = err.reply_text() {
                if let Err(e) = ctx.reply_text(&reply).await {
                    warn!(command = %registry.name(), error = %e, "Failed to send error reply");
                }
            }
        }
        handled
    }

    /// Runs the alias matcher of every root against the message text.
    ///
    /// Returns the number of roots with a matching alias.
    pub async fn check_aliases(&self, message: Arc<dyn MessageContext>) -> usize {
        let text = message.text();
        let ctx = CommandContext::new(message, text);

        let mut matched = 0;
        for registry in self.snapshot() {
            match registry.check_aliases(&ctx).await {
                Ok(true) => matched += 1,
                Ok(false) => {}
                Err(e) => {
                    matched += 1;
                    warn!(command = %registry.name(), error = %e, "Alias action failed");
                }
            }
        }
        matched
    }
}

impl fmt::Debug for CommandSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSystem")
            .field("commands", &self.names())
            .finish()
    }
}
