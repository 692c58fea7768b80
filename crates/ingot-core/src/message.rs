//! Canonical message model shared by every protocol adapter.
//!
//! Adapters translate their wire format into a [`BaseMessage`] and expose the
//! conversation it came from through the [`MessageContext`] trait. Everything
//! above the adapter layer (middleware, events, commands) only ever sees these
//! types.

use std::fmt::{self, Display};
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReplyResult;

// ============================================================================
// Elements
// ============================================================================

/// Whether a message was sent directly to the bot or inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Direct,
    Group,
}

/// The kind of a single [`MessageElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Text,
    Quote,
    Mention,
    Image,
    Video,
    File,
    Voice,
    Sticker,
    Link,
    Other,
}

/// A single unit of message content.
///
/// `content` is the human-readable rendering, `source` carries whatever the
/// adapter needs to reconstruct the element (a user id, a URL, the JSON of a
/// quoted message, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageElement {
    pub kind: ElementKind,
    pub content: String,
    #[serde(default)]
    pub source: String,
}

impl MessageElement {
    /// Creates a plain text element.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Text,
            content: text.into(),
            source: String::new(),
        }
    }

    /// Returns `true` for plain text elements.
    pub fn is_text(&self) -> bool {
        self.kind == ElementKind::Text
    }
}

impl Display for MessageElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// The author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nickname: String,
    /// Group the message was sent from, if any.
    #[serde(default)]
    pub group: Option<String>,
}

// ============================================================================
// BaseMessage
// ============================================================================

/// A protocol-independent inbound or outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseMessage {
    pub kind: MessageKind,
    pub id: String,
    /// Plain-text rendering of the whole message.
    pub content: String,
    pub elements: Vec<MessageElement>,
    pub sender: Sender,
    pub time: SystemTime,
}

impl BaseMessage {
    /// Creates a text-only message, rendering `content` as a single element.
    pub fn text(kind: MessageKind, id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            kind,
            id: id.into(),
            elements: vec![MessageElement::text(content.clone())],
            content,
            sender: Sender::default(),
            time: SystemTime::now(),
        }
    }

    /// Sets the sender (builder pattern).
    pub fn with_sender(mut self, sender: Sender) -> Self {
        self.sender = sender;
        self
    }

    /// Serializes the message to JSON, yielding `"{}"` if that fails.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parses a message previously produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Concatenates the content of all text elements.
    pub fn plain_text(&self) -> String {
        self.elements
            .iter()
            .filter(|e| e.is_text())
            .map(|e| e.content.as_str())
            .collect()
    }
}

// ============================================================================
// MessageBuilder
// ============================================================================

/// Chainable builder for outbound element lists.
///
/// ```rust,ignore
/// let elements = MessageBuilder::new()
///     .quote(ctx.message())
///     .mention(ctx.sender_id())
///     .text(" pong")
///     .build();
/// ctx.reply(elements).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    elements: Vec<MessageElement>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.append(ElementKind::Text, text, "")
    }

    /// Quotes an earlier message; the element source is the quoted message as JSON.
    pub fn quote(self, msg: &BaseMessage) -> Self {
        let source = msg.to_json();
        self.append(ElementKind::Quote, "[quote]", source)
    }

    pub fn mention(self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.append(ElementKind::Mention, format!("@{id}"), id)
    }

    pub fn append(
        mut self,
        kind: ElementKind,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        self.elements.push(MessageElement {
            kind,
            content: content.into(),
            source: source.into(),
        });
        self
    }

    pub fn build(self) -> Vec<MessageElement> {
        self.elements
    }
}

// ============================================================================
// Capability traits
// ============================================================================

/// The conversation an inbound message arrived on.
///
/// This is the only capability the core requires from a protocol adapter.
/// Any adapter implementing it can feed messages into the pipeline.
#[async_trait]
pub trait MessageContext: Send + Sync + 'static {
    /// Name of the protocol that delivered the message (e.g. `"onebot"`).
    fn protocol(&self) -> &str;

    /// Plain text of the message.
    fn text(&self) -> String;

    /// Identifier of the message author.
    fn sender_id(&self) -> &str;

    /// The canonical message.
    fn message(&self) -> &BaseMessage;

    /// Sends `elements` back to the originating conversation.
    async fn reply(&self, elements: Vec<MessageElement>) -> ReplyResult<BaseMessage>;

    /// Sends a plain-text reply.
    async fn reply_text(&self, text: &str) -> ReplyResult<BaseMessage> {
        self.reply(vec![MessageElement::text(text)]).await
    }
}

/// Connection state of a bot account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginStatus {
    #[default]
    Offline,
    Online,
    Connecting,
    Disconnected,
    Reconnecting,
}

/// A logged-in bot account on one protocol.
pub trait BotContext: Send + Sync + 'static {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn protocol(&self) -> &str;

    fn status(&self) -> LoginStatus;
}
