//! Sample plugins.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use ingot::prelude::*;
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, info};

/// Disposers collected during `init`, released together.
#[derive(Default)]
struct Registrations(Mutex<Vec<Disposer>>);

impl Registrations {
    fn keep(&self, disposer: Disposer) {
        self.0.lock().push(disposer);
    }

    fn release(&self) {
        Disposer::all(self.0.lock().drain(..)).dispose();
    }
}

// ============================================================================
// Dice
// ============================================================================

/// `/dice [upper_bound]` rolls one die; `d20` is a shortcut for `/dice 20`.
#[derive(Default)]
pub struct Dice {
    registrations: Registrations,
}

#[async_trait]
impl Plugin for Dice {
    fn name(&self) -> &str {
        "dice"
    }

    async fn init(&self, ingot: &Ingot) -> Result<(), BoxError> {
        let disposer = ingot
            .command("dice [upper_bound:number]=6")
            .option_spec("-t [times:number]=1")
            .alias(r"^d(?P<bound>\d+)$", [("upper_bound", "$bound")])
            .action(|ctx| async move {
                let bound = ctx.arg_int("upper_bound");
                let times = ctx.option_int("times");
                if bound <= 0 {
                    ctx.reply_text("upper bound must be greater than 0").await?;
                    return Ok(());
                }
                if !(1..=20).contains(&times) {
                    ctx.reply_text("times must be between 1 and 20").await?;
                    return Ok(());
                }

                let rolls: Vec<String> = {
                    let mut rng = rand::thread_rng();
                    (0..times)
                        .map(|_| rng.gen_range(1..=bound).to_string())
                        .collect()
                };
                ctx.reply_text(&rolls.join(" ")).await?;
                Ok(())
            })
            .build()?;
        self.registrations.keep(disposer);
        Ok(())
    }

    async fn release(&self, _ingot: &Ingot) -> Result<(), BoxError> {
        self.registrations.release();
        Ok(())
    }
}

// ============================================================================
// Ping
// ============================================================================

/// Answers a bare `ping` message, and `/ping` with what it parsed.
#[derive(Default)]
pub struct Ping {
    registrations: Registrations,
}

#[async_trait]
impl Plugin for Ping {
    fn name(&self) -> &str {
        "ping"
    }

    async fn init(&self, ingot: &Ingot) -> Result<(), BoxError> {
        let on_message = ingot.on(EventHandler::message(|msg| async move {
            if msg.text() == "ping" {
                msg.reply_text("🏓").await?;
            }
            Ok(())
        }))?;
        self.registrations.keep(on_message);

        let command = ingot
            .command("ping [some_arg]=default")
            .option_spec("-o [some_text:text]=default")
            .action(|ctx| async move {
                let mut args: Vec<_> = ctx.kv_args.iter().collect();
                let mut options: Vec<_> = ctx.options.iter().collect();
                args.sort();
                options.sort();
                ctx.reply_text(&format!("🏓, Arguments: {args:?}, Options: {options:?}"))
                    .await?;
                Ok(())
            })
            .build()?;
        self.registrations.keep(command);
        Ok(())
    }

    async fn release(&self, _ingot: &Ingot) -> Result<(), BoxError> {
        self.registrations.release();
        Ok(())
    }
}

// ============================================================================
// Echo
// ============================================================================

/// `/echo <content> [-u]`, and `say ...` as a shortcut taking the rest of
/// the line verbatim.
#[derive(Default)]
pub struct Echo {
    registrations: Registrations,
}

#[async_trait]
impl Plugin for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    async fn init(&self, ingot: &Ingot) -> Result<(), BoxError> {
        let disposer = ingot
            .command("echo <content:text>")
            .option_spec("-u [upper:bool]")
            .alias_with(r"^say\s+\S", |mut ctx| {
                let content = ctx.raw()["say".len()..].trim().to_string();
                ctx.kv_args.insert("content".into(), content);
                ctx
            })
            .action(|ctx| async move {
                let mut content = ctx.arg("content").unwrap_or_default().to_string();
                if ctx.option_bool("upper") {
                    content = content.to_uppercase();
                }
                let reply = MessageBuilder::new()
                    .mention(ctx.sender_id())
                    .text(format!(" {content}"))
                    .build();
                ctx.reply(reply).await?;
                Ok(())
            })
            .build()?;
        self.registrations.keep(disposer);
        Ok(())
    }

    async fn release(&self, _ingot: &Ingot) -> Result<(), BoxError> {
        self.registrations.release();
        Ok(())
    }
}

// ============================================================================
// Help
// ============================================================================

/// `/help` lists every registered command with its grammar.
#[derive(Default)]
pub struct Help {
    registrations: Registrations,
}

#[async_trait]
impl Plugin for Help {
    fn name(&self) -> &str {
        "help"
    }

    async fn init(&self, ingot: &Ingot) -> Result<(), BoxError> {
        let commands = Arc::clone(ingot.commands());
        let prefix = ingot.config().command_prefix.clone();
        let disposer = ingot
            .command("help")
            .action(move |ctx| {
                let text = commands
                    .usages()
                    .iter()
                    .map(|usage| format!("{prefix}{usage}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                async move {
                    ctx.reply_text(&text).await?;
                    Ok(())
                }
            })
            .build()?;
        self.registrations.keep(disposer);
        Ok(())
    }

    async fn release(&self, _ingot: &Ingot) -> Result<(), BoxError> {
        self.registrations.release();
        Ok(())
    }
}

// ============================================================================
// MessageLogger
// ============================================================================

/// Logs every inbound message, and how long the pipeline took for it.
#[derive(Default)]
pub struct MessageLogger {
    registrations: Registrations,
}

#[async_trait]
impl Plugin for MessageLogger {
    fn name(&self) -> &str {
        "message_logger"
    }

    async fn init(&self, ingot: &Ingot) -> Result<(), BoxError> {
        let handler = ingot.on(EventHandler::message(|msg| async move {
            let message = msg.message();
            match message.kind {
                MessageKind::Group => info!(
                    protocol = msg.protocol(),
                    group = message.sender.group.as_deref().unwrap_or_default(),
                    sender = %message.sender.id,
                    "[Group] {}: {}",
                    message.sender.nickname,
                    message.content
                ),
                MessageKind::Direct => info!(
                    protocol = msg.protocol(),
                    sender = %message.sender.id,
                    "[Direct] {}: {}",
                    message.sender.name,
                    message.content
                ),
            }
            Ok(())
        }))?;
        self.registrations.keep(handler);

        let stopwatch = ingot.middleware(
            |_, next| async move {
                let started = Instant::now();
                let result = next.run().await;
                debug!(elapsed = ?started.elapsed(), ok = result.is_ok(), "Message handled");
                result
            },
            true,
        );
        self.registrations.keep(stopwatch);
        Ok(())
    }

    async fn release(&self, _ingot: &Ingot) -> Result<(), BoxError> {
        self.registrations.release();
        Ok(())
    }
}
