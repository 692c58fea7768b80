//! Per-invocation command state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ingot_core::{BaseMessage, MessageContext, MessageElement, ReplyResult};

use crate::input::{parse_bool, parse_float, parse_int};
use crate::split::shell_split;

/// The parsed state of one command invocation.
///
/// A context is created once per inbound message from the text following the
/// command prefix. The dispatcher clones it for every independent matching
/// attempt, so a partial match never leaks into another.
#[derive(Clone)]
pub struct CommandContext {
    message: Arc<dyn MessageContext>,
    raw: String,
    arg_queue: Vec<String>,
    /// Matched command path, outermost first (`["git", "commit"]`).
    pub commands: Vec<String>,
    /// Every positional token consumed, in order, including those after `--`.
    pub arguments: Vec<String>,
    /// Positional values bound to declared argument names.
    pub kv_args: HashMap<String, String>,
    /// Option values keyed by long option name.
    pub options: HashMap<String, String>,
}

impl CommandContext {
    /// Tokenizes `text` for dispatch.
    pub fn new(message: Arc<dyn MessageContext>, text: impl Into<String>) -> Self {
        let raw = text.into();
        let arg_queue = shell_split(&raw);
        Self {
            message,
            raw,
            arg_queue,
            commands: Vec::new(),
            arguments: Vec::new(),
            kv_args: HashMap::new(),
            options: HashMap::new(),
        }
    }

    /// The command text this context was created from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The tokens of [`raw`](Self::raw).
    pub fn tokens(&self) -> &[String] {
        &self.arg_queue
    }

    /// The inbound message this invocation came from.
    pub fn message(&self) -> &Arc<dyn MessageContext> {
        &self.message
    }

    pub fn base_message(&self) -> &BaseMessage {
        self.message.message()
    }

    pub fn sender_id(&self) -> &str {
        self.message.sender_id()
    }

    /// Innermost matched command name.
    pub fn command(&self) -> Option<&str> {
        self.commands.last().map(String::as_str)
    }

    // ------------------------------------------------------------------------
    // Typed accessors
    // ------------------------------------------------------------------------

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.kv_args.get(name).map(String::as_str)
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// Argument as an integer; `0` if absent or not a number.
    pub fn arg_int(&self, name: &str) -> i64 {
        self.arg(name).map(parse_int).unwrap_or(0)
    }

    pub fn arg_float(&self, name: &str) -> f64 {
        self.arg(name).map(parse_float).unwrap_or(0.0)
    }

    pub fn arg_bool(&self, name: &str) -> bool {
        self.arg(name).is_some_and(parse_bool)
    }

    pub fn option_int(&self, name: &str) -> i64 {
        self.option(name).map(parse_int).unwrap_or(0)
    }

    pub fn option_float(&self, name: &str) -> f64 {
        self.option(name).map(parse_float).unwrap_or(0.0)
    }

    /// Option as a flag; `false` if absent.
    pub fn option_bool(&self, name: &str) -> bool {
        self.option(name).is_some_and(parse_bool)
    }

    // ------------------------------------------------------------------------
    // Replies
    // ------------------------------------------------------------------------

    pub async fn reply(&self, elements: Vec<MessageElement>) -> ReplyResult<BaseMessage> {
        self.message.reply(elements).await
    }

    pub async fn reply_text(&self, text: &str) -> ReplyResult<BaseMessage> {
        self.message.reply_text(text).await
    }

    /// Clears everything a previous matching attempt may have produced.
    pub(crate) fn reset(&mut self) {
        self.commands.clear();
        self.arguments.clear();
        self.kv_args.clear();
        self.options.clear();
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("protocol", &self.message.protocol())
            .field("raw", &self.raw)
            .field("commands", &self.commands)
            .field("arguments", &self.arguments)
            .field("kv_args", &self.kv_args)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use ingot_core::{MessageKind, ReplyError};
    use parking_lot::Mutex;

    /// A message context that records every reply it is asked to send.
    pub(crate) struct MockMessage {
        pub(crate) base: BaseMessage,
        pub(crate) replies: Mutex<Vec<String>>,
    }

    impl MockMessage {
        pub(crate) fn new(text: &str) -> Arc<Self> {
            Arc::new(Self {
                base: BaseMessage::text(MessageKind::Direct, "1", text),
                replies: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn replies(&self) -> Vec<String> {
            self.replies.lock().clone()
        }
    }

    #[async_trait]
    impl MessageContext for MockMessage {
        fn protocol(&self) -> &str {
            "mock"
        }

        fn text(&self) -> String {
            self.base.content.clone()
        }

        fn sender_id(&self) -> &str {
            "10001"
        }

        fn message(&self) -> &BaseMessage {
            &self.base
        }

        async fn reply(&self, elements: Vec<MessageElement>) -> ReplyResult<BaseMessage> {
            if elements.is_empty() {
                return Err(ReplyError::Other("empty reply".into()));
            }
            let text: String = elements.iter().map(|e| e.content.as_str()).collect();
            self.replies.lock().push(text.clone());
            Ok(BaseMessage::text(MessageKind::Direct, "reply", text))
        }
    }

    #[test]
    fn test_new_tokenizes() {
        let msg = MockMessage::new("say \"hi there\" -v");
        let ctx = CommandContext::new(msg, "say \"hi there\" -v");
        assert_eq!(ctx.tokens(), ["say", "hi there", "-v"]);
        assert_eq!(ctx.raw(), "say \"hi there\" -v");
        assert!(ctx.commands.is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let msg = MockMessage::new("x");
        let mut original = CommandContext::new(msg, "x");
        let mut copy = original.clone();
        copy.kv_args.insert("a".into(), "1".into());
        copy.commands.push("x".into());
        assert!(original.kv_args.is_empty());
        assert!(original.commands.is_empty());

        original.options.insert("v".into(), "true".into());
        assert!(!copy.has_option("v"));
    }

    #[test]
    fn test_typed_accessors() {
        let msg = MockMessage::new("");
        let mut ctx = CommandContext::new(msg, "");
        ctx.kv_args.insert("n".into(), "20".into());
        ctx.kv_args.insert("ratio".into(), "0.5".into());
        ctx.options.insert("verbose".into(), "true".into());
        ctx.options.insert("count".into(), "abc".into());

        assert_eq!(ctx.arg_int("n"), 20);
        assert_eq!(ctx.arg_float("ratio"), 0.5);
        assert_eq!(ctx.arg_int("missing"), 0);
        assert!(ctx.option_bool("verbose"));
        assert!(!ctx.option_bool("quiet"));
        assert_eq!(ctx.option_int("count"), 0);
    }

    #[tokio::test]
    async fn test_reply_text_reaches_message() {
        let msg = MockMessage::new("ping");
        let ctx = CommandContext::new(msg.clone(), "ping");
        ctx.reply_text("pong").await.unwrap();
        assert_eq!(msg.replies(), vec!["pong"]);
    }
}
