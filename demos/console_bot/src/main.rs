//! Console Bot Example
//!
//! Runs an Ingot instance against stdin/stdout with a few sample plugins.
//!
//! ```text
//! /dice 20          roll a d20
//! d12               shortcut for /dice 12
//! /dice -t 3        roll three d6
//! ping              🏓
//! /echo "hi there" -u
//! say hello world   shortcut for /echo
//! /help             list commands
//! @group /dice      send as a group message
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package console-bot
//! ```

mod console;
mod plugins;

use std::sync::Arc;

use anyhow::Result;
use ingot::prelude::*;

use crate::console::{ConsoleBot, serve};
use crate::plugins::{Dice, Echo, Help, MessageLogger, Ping};

#[tokio::main]
async fn main() -> Result<()> {
    // Loads conf/ingot.toml if present and sets up logging
    let ingot = Arc::new(Ingot::new());

    ingot.add_context(Arc::new(ConsoleBot));

    ingot.use_plugin(MessageLogger::default());
    ingot.use_plugin(Dice::default());
    ingot.use_plugin(Ping::default());
    ingot.use_plugin(Echo::default());
    ingot.use_plugin(Help::default());

    info!("Type a message, or Ctrl+D to quit");

    // Stop when stdin is closed
    ingot.run_until(serve(Arc::clone(&ingot))).await;

    Ok(())
}
