//! Chainable command construction.
//!
//! ```rust,ignore
//! let disposer = CommandBuilder::new("dice [upper_bound:number]=6", system)
//!     .alias(r"^d(?P<bound>\d+)$", [("upper_bound", "$bound")])
//!     .option_spec("-s [secret:bool]")
//!     .sub_command("stats", |sub| sub.action(|ctx| async move {
//!         ctx.reply_text("no rolls yet").await?;
//!         Ok(())
//!     }))
//!     .action(|ctx| async move {
//!         let roll = fastrand(ctx.arg_int("upper_bound"));
//!         ctx.reply_text(&roll.to_string()).await?;
//!         Ok(())
//!     })
//!     .build()?;
//! ```
//!
//! Errors from any step are kept until [`CommandBuilder::build`], which
//! reports the first one and registers nothing.

use std::future::Future;
use std::sync::Arc;

use ingot_core::{BoxError, Disposer};

use crate::context::CommandContext;
use crate::error::{CommandError, CommandResult};
use crate::input::InputType;
use crate::registry::{Alias, Registry, command_handler};
use crate::schema::{Schema, SchemaArgument, SchemaOption};
use crate::system::CommandSystem;

/// Builds a [`Registry`] and registers it with a [`CommandSystem`].
#[must_use = "a command is only registered once `build` is called"]
pub struct CommandBuilder {
    system: Option<Arc<CommandSystem>>,
    state: CommandResult<Registry>,
}

impl CommandBuilder {
    /// Starts a command from its grammar string.
    pub fn new(grammar: &str, system: Arc<CommandSystem>) -> Self {
        Self {
            system: Some(system),
            state: Schema::parse(grammar).map(Registry::new),
        }
    }

    /// Starts a command that is not bound to any system, such as a
    /// sub-command. Finish it with [`into_registry`](Self::into_registry).
    pub fn detached(grammar: &str) -> Self {
        Self {
            system: None,
            state: Schema::parse(grammar).map(Registry::new),
        }
    }

    fn update(mut self, f: impl FnOnce(&mut Registry) -> CommandResult<()>) -> Self {
        if let Ok(registry) = &mut self.state {
            if let Err(e) = f(registry) {
                self.state = Err(e);
            }
        }
        self
    }

    fn update_schema(self, f: impl FnOnce(&mut Schema) -> CommandResult<()>) -> Self {
        self.update(|registry| f(registry.schema_mut()))
    }

    /// Appends a positional argument.
    pub fn argument(
        self,
        name: &str,
        input_type: InputType,
        required: bool,
        default: &str,
    ) -> Self {
        let argument = SchemaArgument {
            name: name.to_string(),
            input_type,
            required,
            default: default.to_string(),
        };
        self.update_schema(|schema| {
            schema.add_argument(argument);
            Ok(())
        })
    }

    /// Adds an option addressable as `-short` and `--name`.
    pub fn option(
        self,
        short: &str,
        name: &str,
        input_type: InputType,
        required: bool,
        default: &str,
    ) -> Self {
        let option = SchemaOption::new(short, name, input_type)
            .with_required(required)
            .with_default(default);
        self.update_schema(|schema| {
            schema.add_option(option);
            Ok(())
        })
    }

    /// Adds an option from a spec such as `-o [output:text]=out.txt`.
    pub fn option_spec(self, spec: &str) -> Self {
        let parsed = Schema::parse_option(spec);
        self.update_schema(|schema| {
            schema.add_option(parsed?);
            Ok(())
        })
    }

    /// Adds a regex alias. `values` maps field names to literals or to
    /// `$group` capture references.
    pub fn alias<K, V>(self, pattern: &str, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let alias = Alias::new(pattern, values);
        self.update(|registry| {
            registry.add_alias(alias?);
            Ok(())
        })
    }

    /// Adds a regex alias that fills every field from its default.
    pub fn alias_pattern(self, pattern: &str) -> Self {
        self.alias(pattern, std::iter::empty::<(String, String)>())
    }

    /// Adds a regex alias whose context is rewritten by `transform` before
    /// the action runs.
    pub fn alias_with<F>(self, pattern: &str, transform: F) -> Self
    where
        F: Fn(CommandContext) -> CommandContext + Send + Sync + 'static,
    {
        let alias = Alias::new(pattern, Default::default());
        self.update(|registry| {
            registry.add_alias(alias?.with_transform(Arc::new(transform)));
            Ok(())
        })
    }

    /// Adds a sub-command configured by `configure`.
    pub fn sub_command(
        self,
        grammar: &str,
        configure: impl FnOnce(CommandBuilder) -> CommandBuilder,
    ) -> Self {
        let child = configure(Self::detached(grammar)).into_registry();
        self.update(|registry| {
            registry.add_child(child?);
            Ok(())
        })
    }

    /// Sets the action run when the command matches.
    pub fn action<F, Fut>(self, action: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let handler = command_handler(action);
        self.update(|registry| {
            registry.set_handler(handler);
            Ok(())
        })
    }

    /// Returns the finished registry without registering it.
    pub fn into_registry(self) -> CommandResult<Registry> {
        self.state
    }

    /// Registers the command.
    pub fn build(self) -> CommandResult<Disposer> {
        let system = self.system.ok_or_else(|| {
            CommandError::format("detached command builders cannot be registered")
        })?;
        let registry = self.state?;
        Ok(system.register(registry))
    }
}
