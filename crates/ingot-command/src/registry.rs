//! Registry tree, dispatch walk and alias matcher.
//!
//! A [`Registry`] binds a [`Schema`] to an action, a list of regex aliases and
//! the registries of its sub-commands. Dispatch resolves the text of a
//! [`CommandContext`] against the tree:
//!
//! 1. the first token must name this registry (case-insensitively);
//! 2. the remaining tokens are walked left to right, where a sub-command
//!    name descends into that child, `--` ends parsing and keeps the rest
//!    verbatim in `arguments`, `--name[=v]`
//!    is a long option, `-abc` is a cluster of short options and anything
//!    else is the next positional argument;
//! 3. defaults are applied and required fields checked against the schema of
//!    the deepest registry reached;
//! 4. that registry's action is awaited with the populated context.
//!
//! Aliases skip the grammar entirely: the first pattern that matches the raw
//! message text (children before parents) fills the fields from static values
//! or named captures and calls the action directly.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use ingot_core::BoxError;
use regex::{Captures, Regex};
use tracing::{debug, trace};

use crate::context::CommandContext;
use crate::error::{CommandError, CommandResult};
use crate::input::InputType;
use crate::schema::{Schema, SchemaOption};

/// A stored command action.
pub type CommandHandler =
    Arc<dyn Fn(CommandContext) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Rewrites the context an alias produced before the action sees it.
pub type AliasTransform = Arc<dyn Fn(CommandContext) -> CommandContext + Send + Sync>;

/// Erases an async closure into a [`CommandHandler`].
pub fn command_handler<F, Fut>(action: F) -> CommandHandler
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move |ctx| action(ctx).boxed())
}

/// Marks an alias value that names a capture group (`$bound`).
const CAPTURE_MARKER: char = '$';

// ============================================================================
// Alias
// ============================================================================

/// A regex shortcut for a command.
#[derive(Clone)]
pub struct Alias {
    pattern: Regex,
    values: HashMap<String, String>,
    transform: Option<AliasTransform>,
}

impl Alias {
    /// Compiles `pattern`. `values` maps argument and option names to either a
    /// literal value or `$group`, the text of a named capture group.
    pub fn new(pattern: &str, values: HashMap<String, String>) -> CommandResult<Self> {
        let pattern = Regex::new(pattern).map_err(|source| CommandError::AliasCompile {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern,
            values,
            transform: None,
        })
    }

    pub fn with_transform(mut self, transform: AliasTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    fn has_group(&self, group: &str) -> bool {
        self.pattern.capture_names().flatten().any(|name| name == group)
    }

    /// Value for one field.
    ///
    /// `$group` resolves to the capture text when the pattern declares that
    /// group, and to nothing if the group did not take part in the match. A
    /// marker naming an unknown group is kept literally.
    fn resolve(&self, field: &str, caps: &Captures<'_>) -> Option<String> {
        let value = self.values.get(field)?;
        match value.strip_prefix(CAPTURE_MARKER) {
            Some(group) if self.has_group(group) => {
                caps.name(group).map(|m| m.as_str().to_string())
            }
            _ => Some(value.clone()),
        }
    }
}

impl fmt::Debug for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alias")
            .field("pattern", &self.pattern.as_str())
            .field("values", &self.values)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// A node of the command tree.
#[derive(Clone)]
pub struct Registry {
    schema: Schema,
    handler: Option<CommandHandler>,
    aliases: Vec<Alias>,
    children: Vec<Registry>,
}

impl Registry {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            handler: None,
            aliases: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_handler(mut self, handler: CommandHandler) -> Self {
        self.set_handler(handler);
        self
    }

    pub fn set_handler(&mut self, handler: CommandHandler) {
        self.handler = Some(handler);
    }

    pub fn add_alias(&mut self, alias: Alias) -> &mut Self {
        self.aliases.push(alias);
        self
    }

    /// Adds a sub-command, mirroring its schema into this one.
    pub fn add_child(&mut self, child: Registry) -> &mut Self {
        self.schema.add_sub_command(child.schema.clone());
        self.children.push(child);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn children(&self) -> &[Registry] {
        &self.children
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Parses `ctx` against this tree and awaits the matched action.
    ///
    /// `ctx` should be a fresh clone; it is overwritten with the parse result.
    pub async fn dispatch(&self, mut ctx: CommandContext) -> CommandResult<()> {
        let target = self.resolve(&mut ctx)?;
        target.invoke(ctx).await
    }

    /// Runs the dispatch walk, filling `ctx` and returning the deepest
    /// registry reached.
    pub fn resolve(&self, ctx: &mut CommandContext) -> CommandResult<&Registry> {
        ctx.reset();
        let tokens = ctx.tokens().to_vec();

        let Some(first) = tokens.first() else {
            return Err(CommandError::Unmatched);
        };
        if !self.schema.matches(first) {
            return Err(CommandError::Unmatched);
        }
        ctx.commands.push(self.schema.name.clone());

        let mut current = self;
        let mut arg_index = 0;
        let mut i = 1;

        while i < tokens.len() {
            let token = tokens[i].as_str();
            i += 1;

            if let Some(child) = current.children.iter().find(|c| c.schema.matches(token)) {
                trace!(command = %child.schema.name, "Descending into sub-command");
                ctx.commands.push(child.schema.name.clone());
                current = child;
                arg_index = 0;
                continue;
            }

            // Everything after `--` is kept verbatim and left unbound.
            if token == "--" {
                ctx.arguments.extend_from_slice(&tokens[i..]);
                break;
            }

            if let Some(body) = token.strip_prefix("--") {
                let (name, value) = parse_long_option(body, &tokens, &mut i, &current.schema)?;
                ctx.options.insert(name, value);
                continue;
            }

            if token.len() > 1
                && token.starts_with('-')
                && !is_negative_number(token, &current.schema)
            {
                let parsed = parse_short_options(token, &tokens, &mut i, &current.schema)?;
                ctx.options.extend(parsed);
                continue;
            }

            let Some(arg) = current.schema.arguments.get(arg_index) else {
                return Err(CommandError::validation("too many arguments"));
            };
            check_type("argument", &arg.name, &arg.input_type, token)?;
            ctx.arguments.push(token.to_string());
            ctx.kv_args.insert(arg.name.clone(), token.to_string());
            arg_index += 1;
        }

        current.finish(ctx)?;
        Ok(current)
    }

    /// Applies defaults and checks required and undeclared fields.
    ///
    /// An empty default counts as no default: the field stays absent.
    fn finish(&self, ctx: &mut CommandContext) -> CommandResult<()> {
        for arg in &self.schema.arguments {
            if ctx.kv_args.contains_key(&arg.name) {
                continue;
            }
            if arg.required {
                return Err(CommandError::validation(format!(
                    "missing required argument '{}'",
                    arg.name
                )));
            }
            if !arg.default.is_empty() {
                ctx.kv_args.insert(arg.name.clone(), arg.default.clone());
            }
        }

        for opt in &self.schema.options {
            if ctx.options.contains_key(&opt.name) {
                continue;
            }
            if opt.required {
                return Err(CommandError::validation(format!(
                    "missing required option '{}'",
                    opt.name
                )));
            }
            if !opt.default.is_empty() {
                ctx.options.insert(opt.name.clone(), opt.default.clone());
            }
        }

        let mut keys: Vec<&String> = ctx.options.keys().collect();
        keys.sort();
        if let Some(key) = keys.into_iter().find(|k| self.schema.find_option(k).is_none()) {
            return Err(CommandError::validation(format!("option '{key}' not found")));
        }
        Ok(())
    }

    async fn invoke(&self, ctx: CommandContext) -> CommandResult<()> {
        match &self.handler {
            Some(handler) => {
                debug!(commands = ?ctx.commands, "Invoking command");
                handler(ctx).await.map_err(CommandError::Handler)
            }
            None => {
                debug!(command = %self.schema.name, "Matched command has no action");
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Aliases
    // ------------------------------------------------------------------------

    /// Tries every alias of this tree against the raw text of `ctx`.
    ///
    /// Returns `Ok(false)` if no alias matched.
    pub async fn check_aliases(&self, ctx: &CommandContext) -> CommandResult<bool> {
        match self.match_alias(ctx, &[]) {
            Some((target, matched)) => {
                target.invoke(matched).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn match_alias(
        &self,
        ctx: &CommandContext,
        parent: &[String],
    ) -> Option<(&Registry, CommandContext)> {
        let mut path = parent.to_vec();
        path.push(self.schema.name.clone());

        for child in &self.children {
            if let Some(hit) = child.match_alias(ctx, &path) {
                return Some(hit);
            }
        }

        for alias in &self.aliases {
            let Some(caps) = alias.pattern.captures(ctx.raw()) else {
                continue;
            };
            trace!(pattern = %alias.pattern(), command = %self.schema.name, "Alias matched");

            let mut target = ctx.clone();
            target.reset();
            target.commands = path;

            for arg in &self.schema.arguments {
                let value = alias
                    .resolve(&arg.name, &caps)
                    .or_else(|| non_empty(&arg.default));
                if let Some(value) = value {
                    target.kv_args.insert(arg.name.clone(), value);
                }
            }
            for opt in &self.schema.options {
                let value = alias
                    .resolve(&opt.name, &caps)
                    .or_else(|| non_empty(&opt.default));
                if let Some(value) = value {
                    target.options.insert(opt.name.clone(), value);
                }
            }

            if let Some(transform) = &alias.transform {
                target = transform(target);
            }
            return Some((self, target));
        }
        None
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("schema", &self.schema.to_format())
            .field("handler", &self.handler.is_some())
            .field("aliases", &self.aliases)
            .field("children", &self.children)
            .finish()
    }
}

// ============================================================================
// Token helpers
// ============================================================================

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn check_type(kind: &str, name: &str, input_type: &InputType, value: &str) -> CommandResult<()> {
    if input_type.validate(value) {
        Ok(())
    } else {
        Err(CommandError::validation(format!(
            "{kind} '{name}' expected type '{input_type}', received '{value}'"
        )))
    }
}

/// `-3` is a positional number unless some option is literally named `3`.
fn is_negative_number(token: &str, schema: &Schema) -> bool {
    InputType::Number.validate(token)
        && token[1..]
            .chars()
            .next()
            .is_some_and(|c| schema.find_option(&c.to_string()).is_none())
}

fn take_value(tokens: &[String], i: &mut usize, key: &str) -> CommandResult<String> {
    let value = tokens.get(*i).cloned().ok_or_else(|| {
        CommandError::validation(format!("option '{key}' expected at least one argument"))
    })?;
    *i += 1;
    Ok(value)
}

/// `--name`, `--name=value` or `--name value`.
fn parse_long_option(
    body: &str,
    tokens: &[String],
    i: &mut usize,
    schema: &Schema,
) -> CommandResult<(String, String)> {
    let (key, inline) = match body.split_once('=') {
        Some((key, value)) => (key, Some(value)),
        None => (body, None),
    };
    let display = format!("--{key}");
    let opt = schema
        .find_option(key)
        .ok_or_else(|| CommandError::validation(format!("option '{display}' not found")))?;

    let value = match inline.filter(|v| !v.is_empty()) {
        Some(value) => value.to_string(),
        None if opt.input_type.is_boolean() => "true".to_string(),
        None => take_value(tokens, i, &display)?,
    };
    check_type("option", &display, &opt.input_type, &value)?;
    Ok((opt.name.clone(), value))
}

/// `-v`, `-abc` (boolean cluster), or `-abn 3` where only the last flag of the
/// cluster may take a value. A token naming a multi-character short option
/// exactly (`-ab` for short `ab`) is a single option.
fn parse_short_options(
    token: &str,
    tokens: &[String],
    i: &mut usize,
    schema: &Schema,
) -> CommandResult<Vec<(String, String)>> {
    let body = &token[1..];
    let exact = schema
        .options
        .iter()
        .find(|opt| opt.short.chars().count() > 1 && opt.short.eq_ignore_ascii_case(body));
    if let Some(opt) = exact {
        return Ok(vec![short_value(opt, token, tokens, i, true)?]);
    }

    let count = body.chars().count();
    let mut parsed = Vec::with_capacity(count);
    for (idx, ch) in body.chars().enumerate() {
        let key = format!("-{ch}");
        let opt = schema
            .find_option(&ch.to_string())
            .ok_or_else(|| CommandError::validation(format!("option '{key}' not found")))?;
        parsed.push(short_value(opt, &key, tokens, i, idx + 1 == count)?);
    }
    Ok(parsed)
}

fn short_value(
    opt: &SchemaOption,
    key: &str,
    tokens: &[String],
    i: &mut usize,
    is_last: bool,
) -> CommandResult<(String, String)> {
    if opt.input_type.is_boolean() {
        return Ok((opt.name.clone(), "true".to_string()));
    }
    if !is_last {
        return Err(CommandError::validation(format!(
            "option '{key}' expected at least one argument"
        )));
    }
    let value = take_value(tokens, i, key)?;
    check_type("option", key, &opt.input_type, &value)?;
    Ok((opt.name.clone(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::MockMessage;
    use parking_lot::Mutex;

    type Seen = Arc<Mutex<Vec<CommandContext>>>;

    fn recording(schema: &str) -> (Registry, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let registry = Registry::new(Schema::parse(schema).unwrap()).with_handler(command_handler(
            move |ctx| {
                let s = Arc::clone(&s);
                async move {
                    s.lock().push(ctx);
                    Ok(())
                }
            },
        ));
        (registry, seen)
    }

    fn ctx(text: &str) -> CommandContext {
        CommandContext::new(MockMessage::new(text), text)
    }

    fn validation(result: CommandResult<()>) -> String {
        match result {
            Err(CommandError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn with_options(mut registry: Registry, specs: &[&str]) -> Registry {
        for spec in specs {
            registry.schema.add_option(Schema::parse_option(spec).unwrap());
        }
        registry
    }

    #[tokio::test]
    async fn test_dice_defaults_and_values() {
        let (dice, seen) = recording("dice [upper_bound:number]=6");

        dice.dispatch(ctx("dice")).await.unwrap();
        dice.dispatch(ctx("dice 20")).await.unwrap();
        let err = validation(dice.dispatch(ctx("dice abc")).await);

        let seen = seen.lock();
        assert_eq!(
            seen[0].kv_args,
            HashMap::from([("upper_bound".to_string(), "6".to_string())])
        );
        assert_eq!(
            seen[1].kv_args,
            HashMap::from([("upper_bound".to_string(), "20".to_string())])
        );
        assert_eq!(
            err,
            "argument 'upper_bound' expected type 'number', received 'abc'"
        );
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn test_name_mismatch_is_unmatched() {
        let (dice, seen) = recording("dice");
        assert!(matches!(dice.dispatch(ctx("roll 3")).await, Err(CommandError::Unmatched)));
        assert!(matches!(dice.dispatch(ctx("")).await, Err(CommandError::Unmatched)));
        dice.dispatch(ctx("DICE")).await.unwrap();
        assert_eq!(seen.lock()[0].commands, vec!["dice"]);
    }

    #[tokio::test]
    async fn test_missing_required_and_too_many() {
        let (echo, _) = recording("echo <content:text>");
        assert_eq!(
            validation(echo.dispatch(ctx("echo")).await),
            "missing required argument 'content'"
        );
        assert_eq!(
            validation(echo.dispatch(ctx("echo a b")).await),
            "too many arguments"
        );
    }

    #[tokio::test]
    async fn test_unknown_short_option() {
        let (cmd, _) = recording("cmd");
        let cmd = with_options(cmd, &["-o [text]=default"]);
        assert_eq!(
            validation(cmd.dispatch(ctx("cmd -z")).await),
            "option '-z' not found"
        );
        assert_eq!(
            validation(cmd.dispatch(ctx("cmd --zeta")).await),
            "option '--zeta' not found"
        );
    }

    #[tokio::test]
    async fn test_option_forms() {
        let (cmd, seen) = recording("send [to]");
        let cmd = with_options(
            cmd,
            &["-v [verbose:bool]", "-q [quiet:bool]", "-n [count:int]=1", "-m [message]"],
        );

        cmd.dispatch(ctx("send bob -vq -n 3 --message=hi")).await.unwrap();
        cmd.dispatch(ctx("send --count 5 --verbose=off")).await.unwrap();
        cmd.dispatch(ctx("send -vn 7")).await.unwrap();

        let seen = seen.lock();
        let first = &seen[0];
        assert_eq!(first.arg("to"), Some("bob"));
        assert!(first.option_bool("verbose"));
        assert!(first.option_bool("quiet"));
        assert_eq!(first.option_int("count"), 3);
        assert_eq!(first.option("message"), Some("hi"));

        let second = &seen[1];
        assert_eq!(second.arg("to"), None);
        assert_eq!(second.option("count"), Some("5"));
        assert!(!second.option_bool("verbose"));
        assert!(!second.has_option("quiet"));

        assert_eq!(seen[2].option("count"), Some("7"));
        assert_eq!(seen[2].option("verbose"), Some("true"));
    }

    #[tokio::test]
    async fn test_option_errors() {
        let (cmd, _) = recording("send");
        let cmd = with_options(cmd, &["-v [verbose:bool]", "-n [count:int]", "-t [token]"]);

        assert_eq!(
            validation(cmd.dispatch(ctx("send -nv 3")).await),
            "option '-n' expected at least one argument"
        );
        assert_eq!(
            validation(cmd.dispatch(ctx("send -n")).await),
            "option '-n' expected at least one argument"
        );
        assert_eq!(
            validation(cmd.dispatch(ctx("send -n many")).await),
            "option '-n' expected type 'number', received 'many'"
        );
        assert_eq!(
            validation(cmd.dispatch(ctx("send --count=x")).await),
            "option '--count' expected type 'number', received 'x'"
        );
        assert_eq!(
            validation(cmd.dispatch(ctx("send --verbose=maybe")).await),
            "option '--verbose' expected type 'bool', received 'maybe'"
        );
    }

    #[tokio::test]
    async fn test_required_option() {
        let (cmd, seen) = recording("login");
        let cmd = with_options(cmd, &["-u <user>"]);
        assert_eq!(
            validation(cmd.dispatch(ctx("login")).await),
            "missing required option 'user'"
        );
        cmd.dispatch(ctx("login -u alice")).await.unwrap();
        assert_eq!(seen.lock()[0].option("user"), Some("alice"));
    }

    #[tokio::test]
    async fn test_double_dash_ends_options() {
        let (echo, seen) = recording("echo [content]");
        let echo = with_options(echo, &["-v [verbose:bool]"]);

        echo.dispatch(ctx("echo -v -- -x extra")).await.unwrap();
        let seen = seen.lock();
        assert_eq!(seen[0].arguments, vec!["-x", "extra"]);
        assert_eq!(seen[0].arg("content"), None);
        assert!(seen[0].option_bool("verbose"));
    }

    #[tokio::test]
    async fn test_empty_default_leaves_field_absent() {
        let (greet, seen) = recording("greet [name] [mood]=happy");
        let greet = with_options(greet, &["-t [tag]", "-l [lang]=en"]);

        greet.dispatch(ctx("greet")).await.unwrap();
        let seen = seen.lock();
        assert_eq!(seen[0].arg("name"), None);
        assert_eq!(seen[0].arg("mood"), Some("happy"));
        assert_eq!(seen[0].option("tag"), None);
        assert_eq!(seen[0].option("lang"), Some("en"));
    }

    #[tokio::test]
    async fn test_double_dash_tokens_are_verbatim() {
        let (dice, seen) = recording("dice [upper_bound:number]=6");

        dice.dispatch(ctx("dice -- abc")).await.unwrap();
        dice.dispatch(ctx("dice -- 1 2 3")).await.unwrap();
        dice.dispatch(ctx("dice 4 -- x")).await.unwrap();
        let seen = seen.lock();
        assert_eq!(seen[0].arguments, vec!["abc"]);
        assert_eq!(seen[0].arg("upper_bound"), Some("6"));
        assert_eq!(seen[1].arguments, vec!["1", "2", "3"]);
        assert_eq!(seen[1].arg("upper_bound"), Some("6"));
        assert_eq!(seen[2].arguments, vec!["4", "x"]);
        assert_eq!(seen[2].arg("upper_bound"), Some("4"));

        let (echo, _) = recording("echo <content>");
        assert_eq!(
            validation(echo.dispatch(ctx("echo -- hi")).await),
            "missing required argument 'content'"
        );
    }

    #[tokio::test]
    async fn test_negative_number_and_lone_dash_are_positional() {
        let (calc, seen) = recording("add <a:number> <b:number> [op]");
        calc.dispatch(ctx("add -3 4 -")).await.unwrap();
        let seen = seen.lock();
        assert_eq!(seen[0].arg("a"), Some("-3"));
        assert_eq!(seen[0].arg("op"), Some("-"));
    }

    #[tokio::test]
    async fn test_sub_command_descent() {
        let (mut git, root_seen) = recording("git");
        let (commit, commit_seen) = recording("commit <message>");
        git.add_child(with_options(commit, &["-a [all:bool]"]));

        git.dispatch(ctx("git COMMIT -a \"first draft\"")).await.unwrap();
        git.dispatch(ctx("git")).await.unwrap();
        assert_eq!(
            validation(git.dispatch(ctx("git commit")).await),
            "missing required argument 'message'"
        );

        let commit_seen = commit_seen.lock();
        assert_eq!(commit_seen[0].commands, vec!["git", "commit"]);
        assert_eq!(commit_seen[0].arg("message"), Some("first draft"));
        assert!(commit_seen[0].option_bool("all"));
        assert_eq!(root_seen.lock().len(), 1);
        assert_eq!(git.schema().sub_commands.len(), 1);
    }

    #[tokio::test]
    async fn test_option_not_declared_by_sub_command() {
        let (git, _) = recording("git");
        let mut git = with_options(git, &["-C [dir]"]);
        let (status, _) = recording("status");
        git.add_child(status);

        assert_eq!(
            validation(git.dispatch(ctx("git -C repo status")).await),
            "option 'dir' not found"
        );
    }

    #[tokio::test]
    async fn test_handler_error_is_reported() {
        let failing = Registry::new(Schema::parse("fail").unwrap())
            .with_handler(command_handler(|_| async { Err::<(), BoxError>("nope".into()) }));
        let err = failing.dispatch(ctx("fail")).await.unwrap_err();
        assert!(matches!(err, CommandError::Handler(_)));
        assert_eq!(err.reply_text().as_deref(), Some("nope"));
        assert_eq!(CommandError::Unmatched.reply_text(), None);

        let silent = Registry::new(Schema::parse("silent").unwrap());
        silent.dispatch(ctx("silent")).await.unwrap();
    }

    #[tokio::test]
    async fn test_alias_exact_pattern() {
        let (mut ping, seen) = recording("ping");
        ping.add_alias(Alias::new("^ping$", HashMap::new()).unwrap());

        assert!(ping.check_aliases(&ctx("ping")).await.unwrap());
        assert!(!ping.check_aliases(&ctx("pingpong")).await.unwrap());
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0].commands, vec!["ping"]);
    }

    #[tokio::test]
    async fn test_alias_capture_substitution() {
        let (dice, seen) = recording("dice [upper_bound:number]=6 [label]");
        let mut dice = with_options(dice, &["-s [secret:bool]=false"]);
        let values = HashMap::from([
            ("upper_bound".to_string(), "$bound".to_string()),
            ("label".to_string(), "$missing".to_string()),
        ]);
        dice.add_alias(Alias::new(r"^d(?P<bound>\d+)?$", values).unwrap());

        assert!(dice.check_aliases(&ctx("d20")).await.unwrap());
        assert!(dice.check_aliases(&ctx("d")).await.unwrap());

        let seen = seen.lock();
        assert_eq!(seen[0].arg("upper_bound"), Some("20"));
        assert_eq!(seen[0].arg("label"), Some("$missing"));
        assert_eq!(seen[0].option("secret"), Some("false"));
        assert_eq!(seen[1].arg("upper_bound"), Some("6"));
    }

    #[tokio::test]
    async fn test_alias_children_first_and_transform() {
        let (mut parent, parent_seen) = recording("weather");
        parent.add_alias(Alias::new("weather", HashMap::new()).unwrap());

        let (mut child, child_seen) = recording("today");
        let transform: AliasTransform = Arc::new(|mut ctx: CommandContext| {
            ctx.kv_args.insert("when".into(), "now".into());
            ctx
        });
        child.add_alias(
            Alias::new("^weather today$", HashMap::new())
                .unwrap()
                .with_transform(transform),
        );
        parent.add_child(child);

        assert!(parent.check_aliases(&ctx("weather today")).await.unwrap());
        assert!(parent.check_aliases(&ctx("weather tomorrow")).await.unwrap());

        let child_seen = child_seen.lock();
        assert_eq!(child_seen.len(), 1);
        assert_eq!(child_seen[0].commands, vec!["weather", "today"]);
        assert_eq!(child_seen[0].arg("when"), Some("now"));
        assert_eq!(parent_seen.lock().len(), 1);
    }

    #[test]
    fn test_bad_alias_pattern() {
        let err = Alias::new("(unclosed", HashMap::new()).unwrap_err();
        assert!(matches!(err, CommandError::AliasCompile { ref pattern, .. } if pattern == "(unclosed"));
    }
}
