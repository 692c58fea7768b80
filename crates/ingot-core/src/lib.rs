//! # Ingot Core
//!
//! The protocol-independent heart of the Ingot bot framework.
//!
//! This crate defines what every other layer agrees on:
//!
//! - **Message Model**: the canonical [`BaseMessage`] and its elements, plus the
//!   [`MessageContext`] capability an adapter implements for each inbound message
//! - **Event System**: named publish/subscribe buckets ([`EventBus`])
//! - **Middleware Pipeline**: onion-ordered interceptors around every
//!   dispatch ([`MiddlewarePipeline`], [`Next`])
//! - **Disposers**: idempotent removal handles returned by every
//!   registration ([`Disposer`])
//!
//! ## Message Flow
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌──────────┐     ┌──────────┐
//! │   Adapter   │────▶│ Middleware │────▶│ EventBus │────▶│ Commands │
//! │ (Message    │     │  Pipeline  │     │"message" │     │ (ingot-  │
//! │  Context)   │     └────────────┘     └──────────┘     │ command) │
//! └─────────────┘                                         └──────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use ingot_core::{EventBus, EventPayload, MiddlewarePipeline};
//!
//! let bus = Arc::new(EventBus::new());
//! bus.register("message");
//!
//! let pipeline = MiddlewarePipeline::new();
//! pipeline.add(|ctx, next| async move {
//!     tracing::info!(text = %ctx.text(), "inbound");
//!     next.run().await
//! }, false);
//!
//! let events = Arc::clone(&bus);
//! pipeline.dispatch(ctx.clone(), move || async move {
//!     events.emit("message", EventPayload::new(ctx)).await?;
//!     Ok(())
//! }).await?;
//! ```

pub mod dispose;
pub mod error;
pub mod event;
pub mod message;
pub mod middleware;

pub use dispose::Disposer;
pub use error::{BoxError, EventError, EventResult, ReplyError, ReplyResult};
pub use event::{EventBus, EventCallback, EventPayload};
pub use message::{
    BaseMessage, BotContext, ElementKind, LoginStatus, MessageBuilder, MessageContext,
    MessageElement, MessageKind, Sender,
};
pub use middleware::{MiddlewareFn, MiddlewarePipeline, Next, Terminal, middleware_fn};

/// Re-exported so downstream crates can implement [`MessageContext`].
pub use async_trait::async_trait;
pub use futures::future::BoxFuture;

/// Prelude for common imports.
pub mod prelude {
    pub use super::dispose::Disposer;
    pub use super::error::{BoxError, ReplyError};
    pub use super::event::{EventBus, EventPayload};
    pub use super::message::*;
    pub use super::middleware::{MiddlewarePipeline, Next};
}
