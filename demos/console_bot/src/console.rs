//! A chat adapter that talks over stdin/stdout.
//!
//! Each input line is one direct message from the local user; replies are
//! printed prefixed with `bot>`. Lines starting with `@group ` are delivered
//! as group messages instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use ingot::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

pub const PROTOCOL: &str = "console";
pub const LOCAL_USER: &str = "console-user";

const GROUP_PREFIX: &str = "@group ";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> String {
    NEXT_ID.fetch_add(1, Ordering::Relaxed).to_string()
}

/// One line typed into the console.
pub struct ConsoleMessage {
    message: BaseMessage,
}

impl ConsoleMessage {
    pub fn from_line(line: &str) -> Self {
        let (kind, text, group) = match line.strip_prefix(GROUP_PREFIX) {
            Some(rest) => (MessageKind::Group, rest, Some("console-room".to_string())),
            None => (MessageKind::Direct, line, None),
        };
        let message = BaseMessage::text(kind, next_id(), text).with_sender(Sender {
            id: LOCAL_USER.to_string(),
            name: "you".to_string(),
            nickname: "you".to_string(),
            group,
        });
        Self { message }
    }
}

#[async_trait]
impl MessageContext for ConsoleMessage {
    fn protocol(&self) -> &str {
        PROTOCOL
    }

    fn text(&self) -> String {
        self.message.plain_text()
    }

    fn sender_id(&self) -> &str {
        &self.message.sender.id
    }

    fn message(&self) -> &BaseMessage {
        &self.message
    }

    async fn reply(&self, elements: Vec<MessageElement>) -> ReplyResult<BaseMessage> {
        if elements.is_empty() {
            return Err(ReplyError::Other("empty reply".into()));
        }

        let content: String = elements.iter().map(ToString::to_string).collect();
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("bot> {content}\n").as_bytes())
            .await
            .map_err(|e| ReplyError::SendFailed(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| ReplyError::SendFailed(e.to_string()))?;

        let mut sent = BaseMessage::text(self.message.kind, next_id(), content);
        sent.elements = elements;
        sent.sender = Sender {
            id: ConsoleBot::ID.to_string(),
            name: ConsoleBot::NAME.to_string(),
            ..Default::default()
        };
        Ok(sent)
    }
}

/// The bot account behind the console.
pub struct ConsoleBot;

impl ConsoleBot {
    const ID: &'static str = "console-bot";
    const NAME: &'static str = "Ingot";
}

impl BotContext for ConsoleBot {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn protocol(&self) -> &str {
        PROTOCOL
    }

    fn status(&self) -> LoginStatus {
        LoginStatus::Online
    }
}

/// Feeds stdin lines into `ingot` until EOF.
pub async fn serve(ingot: Arc<Ingot>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Console closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read from console");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let msg: Arc<dyn MessageContext> = Arc::new(ConsoleMessage::from_line(line));
        if let Err(e) = ingot.handle_message(msg).await {
            warn!(error = %e, "Message handling failed");
        }
    }
}
