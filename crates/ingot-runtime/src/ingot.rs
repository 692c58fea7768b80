//! The bot instance.
//!
//! An [`Ingot`] ties the pieces together. Adapters feed it messages through
//! [`Ingot::handle_message`]; plugins register behavior through
//! [`Ingot::command`], [`Ingot::on`] and [`Ingot::middleware`].
//!
//! Every inbound message takes this path:
//!
//! ```text
//! handle_message
//!   └─▶ middleware pipeline (onion)
//!         └─▶ terminal
//!               ├─▶ "message" event
//!               ├─▶ alias matcher (every message)
//!               └─▶ text starts with the command prefix?
//!                     ├─▶ "command" event
//!                     └─▶ command dispatch
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ingot_runtime::Ingot;
//!
//! let ingot = Arc::new(Ingot::builder().config_file("conf/ingot.toml").build()?);
//! ingot.use_plugin(DicePlugin::default());
//!
//! let adapter = ConsoleAdapter::new(Arc::clone(&ingot));
//! tokio::spawn(adapter.run());
//!
//! ingot.run().await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use ingot_command::{CommandBuilder, CommandContext, CommandSystem};
use ingot_core::{
    BotContext, BoxError, Disposer, EventBus, EventCallback, EventPayload, EventResult,
    MessageContext, MiddlewarePipeline, Next,
};
use parking_lot::{Mutex, RwLock};
use tokio::signal;
use tracing::{Instrument, debug, debug_span, error, info, trace, warn};

use crate::config::{ConfigLoader, ConfigResult, IngotConfig};
use crate::error::RuntimeResult;
use crate::logging;
use crate::plugin::{BoxedPlugin, Plugin};

/// Event published for every inbound message. Payload: `Arc<dyn MessageContext>`.
pub const MESSAGE_EVENT: &str = "message";

/// Event published for every prefixed message before command dispatch.
/// Payload: [`CommandContext`].
pub const COMMAND_EVENT: &str = "command";

// =============================================================================
// EventHandler
// =============================================================================

/// A subscription waiting to be passed to [`Ingot::on`].
pub struct EventHandler {
    event: String,
    callback: EventCallback,
}

impl EventHandler {
    /// Subscribes `callback` to any named event with a raw payload.
    pub fn new<F, Fut>(event: impl Into<String>, callback: F) -> Self
    where
        F: Fn(EventPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self {
            event: event.into(),
            callback: Arc::new(move |payload| callback(payload).boxed()),
        }
    }

    /// Subscribes to every inbound message.
    pub fn message<F, Fut>(callback: F) -> Self
    where
        F: Fn(Arc<dyn MessageContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self::typed::<Arc<dyn MessageContext>, _, _>(MESSAGE_EVENT, move |msg| {
            callback(Arc::clone(msg))
        })
    }

    /// Subscribes to every prefixed message, before command dispatch.
    pub fn command<F, Fut>(callback: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self::typed::<CommandContext, _, _>(COMMAND_EVENT, move |ctx| callback(ctx.clone()))
    }

    /// Downcasts the payload to `T` first; a payload of another type fails
    /// the emission with [`EventError::PayloadMismatch`](ingot_core::EventError).
    fn typed<T, F, Fut>(event: &str, callback: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self {
            event: event.to_string(),
            callback: Arc::new(
                move |payload: EventPayload| -> BoxFuture<'static, Result<(), BoxError>> {
                    let value = match payload.expect::<T>() {
                        Ok(value) => value,
                        Err(e) => return futures::future::ready(Err(e.into())).boxed(),
                    };
                    callback(value).boxed()
                },
            ),
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }
}

impl std::fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandler")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Router
// =============================================================================

/// What the pipeline terminal needs, detached from the instance so it can
/// move into the `'static` terminal future.
#[derive(Clone)]
struct Router {
    events: Arc<EventBus>,
    commands: Arc<CommandSystem>,
    prefix: Arc<str>,
}

impl Router {
    async fn route(self, msg: Arc<dyn MessageContext>) -> Result<(), BoxError> {
        self.events
            .emit(MESSAGE_EVENT, EventPayload::new(Arc::clone(&msg)))
            .await?;

        let aliased = self.commands.check_aliases(Arc::clone(&msg)).await;
        if aliased > 0 {
            debug!(aliased, "Alias matched");
        }

        let text = msg.text();
        let Some(command) = text.strip_prefix(&*self.prefix).map(str::trim) else {
            return Ok(());
        };
        if command.is_empty() {
            trace!("Bare command prefix ignored");
            return Ok(());
        }

        let ctx = CommandContext::new(msg, command);
        self.events
            .emit(COMMAND_EVENT, EventPayload::new(ctx.clone()))
            .await?;

        let handled = self.commands.emit(&ctx).await;
        debug!(command, handled, "Command dispatched");
        Ok(())
    }
}

// =============================================================================
// Ingot
// =============================================================================

/// A bot instance: events, middlewares, commands, bot contexts and plugins.
///
/// All methods take `&self`; share the instance between adapters with an
/// `Arc`.
pub struct Ingot {
    config: IngotConfig,
    events: Arc<EventBus>,
    pipeline: MiddlewarePipeline,
    commands: Arc<CommandSystem>,
    contexts: RwLock<HashMap<String, Arc<dyn BotContext>>>,
    plugins: Mutex<Vec<BoxedPlugin>>,
    /// Plugins whose `init` succeeded, in start order.
    started: Mutex<Vec<BoxedPlugin>>,
    running: AtomicBool,
}

impl Ingot {
    /// Creates an instance from the configuration found in the usual places
    /// (`./conf`, the current directory, the user config directory).
    ///
    /// Falls back to defaults if loading fails.
    pub fn new() -> Self {
        let config = ConfigLoader::new().load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config ({e}), using defaults");
            IngotConfig::default()
        });
        Self::from_config(config)
    }

    pub fn builder() -> IngotBuilder {
        IngotBuilder::new()
    }

    /// Creates an instance from an already loaded configuration and
    /// initializes logging from it.
    pub fn from_config(config: IngotConfig) -> Self {
        logging::init_from_config(&config.logging);

        let events = Arc::new(EventBus::new());
        events.register(MESSAGE_EVENT);
        events.register(COMMAND_EVENT);

        info!(
            command_prefix = %config.command_prefix,
            log_level = %config.logging.level,
            "Ingot initialized from configuration"
        );

        Self {
            config,
            events,
            pipeline: MiddlewarePipeline::new(),
            commands: Arc::new(CommandSystem::new()),
            contexts: RwLock::new(HashMap::new()),
            plugins: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &IngotConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn commands(&self) -> &Arc<CommandSystem> {
        &self.commands
    }

    pub fn pipeline(&self) -> &MiddlewarePipeline {
        &self.pipeline
    }

    // =========================================================================
    // Plugin surface
    // =========================================================================

    /// Starts a command definition; see [`CommandBuilder`].
    pub fn command(&self, grammar: &str) -> CommandBuilder {
        CommandBuilder::new(grammar, Arc::clone(&self.commands))
    }

    /// Subscribes an event handler.
    pub fn on(&self, handler: EventHandler) -> EventResult<Disposer> {
        self.events.on_boxed(&handler.event, handler.callback)
    }

    /// Adds a middleware around every inbound message. `prepend` puts it in
    /// front of all existing ones.
    pub fn middleware<F, Fut>(&self, callback: F, prepend: bool) -> Disposer
    where
        F: Fn(Arc<dyn MessageContext>, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.pipeline.add(callback, prepend)
    }

    /// Creates a custom event that plugins can publish and subscribe to.
    pub fn register_event(&self, name: &str) {
        self.events.register(name);
    }

    pub async fn emit_event(&self, name: &str, payload: EventPayload) -> EventResult<()> {
        self.events.emit(name, payload).await
    }

    /// Configured owner account for `protocol`.
    pub fn owner(&self, protocol: &str) -> Option<&str> {
        self.config.owners.get(protocol).map(String::as_str)
    }

    /// Whether `msg` was sent by the owner configured for its protocol.
    pub fn is_owner(&self, msg: &dyn MessageContext) -> bool {
        self.owner(msg.protocol()) == Some(msg.sender_id())
    }

    // =========================================================================
    // Bot contexts
    // =========================================================================

    /// Registers the bot of one protocol. Returns `false` if that protocol
    /// already has one.
    pub fn add_context(&self, context: Arc<dyn BotContext>) -> bool {
        let mut contexts = self.contexts.write();
        let protocol = context.protocol().to_string();
        if contexts.contains_key(&protocol) {
            warn!(protocol = %protocol, "Bot context already registered");
            return false;
        }
        info!(protocol = %protocol, bot = %context.id(), "Bot context added");
        contexts.insert(protocol, context);
        true
    }

    pub fn context(&self, protocol: &str) -> Option<Arc<dyn BotContext>> {
        self.contexts.read().get(protocol).cloned()
    }

    /// Returns `false` if no context was registered for `protocol`.
    pub fn remove_context(&self, protocol: &str) -> bool {
        self.contexts.write().remove(protocol).is_some()
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Entry point for adapters: runs one inbound message through the
    /// middleware pipeline, the events and the commands.
    ///
    /// The first middleware or event handler error stops the message and is
    /// returned. Command failures are handled inside the command system.
    pub async fn handle_message(&self, msg: Arc<dyn MessageContext>) -> Result<(), BoxError> {
        let span = debug_span!(
            "message",
            protocol = %msg.protocol(),
            sender = %msg.sender_id()
        );
        let router = Router {
            events: Arc::clone(&self.events),
            commands: Arc::clone(&self.commands),
            prefix: Arc::from(self.config.command_prefix.as_str()),
        };
        let inbound = Arc::clone(&msg);
        self.pipeline
            .dispatch(msg, move || router.route(inbound))
            .instrument(span)
            .await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Queues a plugin; it is initialized by [`start`](Self::start).
    pub fn use_plugin(&self, plugin: impl Plugin + 'static) {
        self.plugins.lock().push(Arc::new(plugin));
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Initializes every queued plugin in order. A plugin that fails is
    /// logged and skipped.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Ingot is already running");
            return;
        }

        let plugins: Vec<BoxedPlugin> = self.plugins.lock().drain(..).collect();
        for plugin in plugins {
            debug!(plugin = plugin.name(), "Initializing plugin");
            match plugin.init(self).await {
                Ok(()) => {
                    info!(plugin = plugin.name(), "Plugin initialized");
                    self.started.lock().push(plugin);
                }
                Err(e) => error!(plugin = plugin.name(), error = %e, "Failed to initialize plugin"),
            }
        }

        info!(
            plugins = self.started.lock().len(),
            commands = self.commands.len(),
            "Ingot started"
        );
    }

    /// Releases started plugins in reverse start order.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Ingot is not running");
            return;
        }

        let plugins: Vec<BoxedPlugin> = self.started.lock().drain(..).rev().collect();
        for plugin in plugins {
            if let Err(e) = plugin.release(self).await {
                error!(plugin = plugin.name(), error = %e, "Error during plugin release");
                continue;
            }
            debug!(plugin = plugin.name(), "Plugin released");
        }

        info!("Ingot stopped");
    }

    /// Starts, waits for Ctrl+C or SIGTERM, then stops.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start().await;
        info!("Ingot is now running. Press Ctrl+C to stop.");

        let waited = wait_for_shutdown().await;
        self.stop().await;
        waited.map_err(Into::into)
    }

    /// Like [`run`](Self::run) with a custom shutdown future.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.start().await;
        shutdown.await;
        self.stop().await;
    }
}

impl Default for Ingot {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ingot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingot")
            .field("command_prefix", &self.config.command_prefix)
            .field("events", &self.events)
            .field("pipeline", &self.pipeline)
            .field("commands", &self.commands)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() -> std::io::Result<()> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    tokio::select! {
        res = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            res
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
            Ok(())
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> std::io::Result<()> {
    signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");
    Ok(())
}

// =============================================================================
// IngotBuilder
// =============================================================================

/// Builder for an [`Ingot`] with custom configuration sources.
///
/// ```rust,ignore
/// let ingot = Ingot::builder()
///     .config_file("conf/production.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct IngotBuilder {
    config_loader: ConfigLoader,
}

impl IngotBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges programmatic configuration over the defaults.
    pub fn merge(mut self, config: IngotConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> ConfigResult<Ingot> {
        let config = self.config_loader.load()?;
        Ok(Ingot::from_config(config))
    }
}

impl Default for IngotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
