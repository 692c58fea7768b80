//! Onion-style middleware pipeline.
//!
//! Every inbound message passes through the registered middlewares in order
//! before reaching the terminal handler (event fan-out and command dispatch).
//! A middleware receives the message context and a [`Next`] continuation:
//!
//! ```rust,ignore
//! pipeline.add(|ctx, next| async move {
//!     let started = Instant::now();
//!     next.run().await?;
//!     debug!(elapsed = ?started.elapsed(), text = %ctx.text(), "handled");
//!     Ok(())
//! }, false);
//! ```
//!
//! Returning without calling `next` stops the message there. Middlewares
//! handed to [`Next::run_with`] are appended to the chain of the current
//! dispatch only.
//!
//! Dispatches on one pipeline never overlap: the whole chain runs under an
//! async lock. Dispatching on the same pipeline from inside one of its own
//! middlewares therefore waits forever.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::trace;
use uuid::Uuid;

use crate::dispose::Disposer;
use crate::error::BoxError;
use crate::message::MessageContext;

/// A stored middleware callback.
pub type MiddlewareFn = Arc<
    dyn Fn(Arc<dyn MessageContext>, Next) -> BoxFuture<'static, Result<(), BoxError>>
        + Send
        + Sync,
>;

/// The innermost step of a dispatch.
pub type Terminal = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// Erases an async closure into a [`MiddlewareFn`].
pub fn middleware_fn<F, Fut>(callback: F) -> MiddlewareFn
where
    F: Fn(Arc<dyn MessageContext>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move |ctx, next| callback(ctx, next).boxed())
}

// ============================================================================
// Next
// ============================================================================

struct ChainState {
    chain: Vec<MiddlewareFn>,
    cursor: usize,
    terminal: Option<Terminal>,
}

enum Step {
    Middleware(MiddlewareFn),
    Terminal(Terminal),
    Exhausted,
}

/// Continuation handed to each middleware.
///
/// All clones drive the same chain: each call to [`run`](Self::run) advances
/// one shared cursor. Once the chain is exhausted the terminal runs, and it
/// runs at most once per dispatch.
#[derive(Clone)]
pub struct Next {
    ctx: Arc<dyn MessageContext>,
    state: Arc<Mutex<ChainState>>,
}

impl Next {
    fn new(ctx: Arc<dyn MessageContext>, chain: Vec<MiddlewareFn>, terminal: Terminal) -> Self {
        Self {
            ctx,
            state: Arc::new(Mutex::new(ChainState {
                chain,
                cursor: 0,
                terminal: Some(terminal),
            })),
        }
    }

    /// Invokes the rest of the chain.
    pub async fn run(&self) -> Result<(), BoxError> {
        self.run_with(Vec::new()).await
    }

    /// Appends `extras` to this dispatch's chain, then invokes the rest of it.
    pub async fn run_with(
        &self,
        extras: impl IntoIterator<Item = MiddlewareFn>,
    ) -> Result<(), BoxError> {
        let step = {
            let mut state = self.state.lock();
            state.chain.extend(extras);
            if state.cursor < state.chain.len() {
                let mw = Arc::clone(&state.chain[state.cursor]);
                state.cursor += 1;
                Step::Middleware(mw)
            } else if let Some(terminal) = state.terminal.take() {
                Step::Terminal(terminal)
            } else {
                Step::Exhausted
            }
        };

        match step {
            Step::Middleware(mw) => mw(Arc::clone(&self.ctx), self.clone()).await,
            Step::Terminal(terminal) => {
                trace!("Middleware chain reached terminal");
                terminal().await
            }
            Step::Exhausted => Ok(()),
        }
    }

    /// The message being dispatched.
    pub fn context(&self) -> &Arc<dyn MessageContext> {
        &self.ctx
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Next")
            .field("cursor", &state.cursor)
            .field("len", &state.chain.len())
            .field("terminal_pending", &state.terminal.is_some())
            .finish()
    }
}

// ============================================================================
// MiddlewarePipeline
// ============================================================================

/// Ordered middleware list plus the per-pipeline dispatch lock.
#[derive(Default)]
pub struct MiddlewarePipeline {
    entries: Arc<Mutex<Vec<(Uuid, MiddlewareFn)>>>,
    dispatch_lock: tokio::sync::Mutex<()>,
}

impl MiddlewarePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a middleware. With `prepend` it becomes the outermost layer,
    /// otherwise the innermost.
    pub fn add<F, Fut>(&self, callback: F, prepend: bool) -> Disposer
    where
        F: Fn(Arc<dyn MessageContext>, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.add_boxed(middleware_fn(callback), prepend)
    }

    pub fn add_boxed(&self, callback: MiddlewareFn, prepend: bool) -> Disposer {
        let id = Uuid::new_v4();
        {
            let mut entries = self.entries.lock();
            if prepend {
                entries.insert(0, (id, callback));
            } else {
                entries.push((id, callback));
            }
        }
        trace!(%id, prepend, "Added middleware");

        let entries = Arc::downgrade(&self.entries);
        Disposer::new(move || {
            if let Some(entries) = entries.upgrade() {
                entries.lock().retain(|(entry, _)| *entry != id);
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `ctx` through the chain, ending in `terminal`.
    ///
    /// The first error returned by a middleware or the terminal aborts the
    /// dispatch and is returned.
    pub async fn dispatch<F, Fut>(
        &self,
        ctx: Arc<dyn MessageContext>,
        terminal: F,
    ) -> Result<(), BoxError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let _guard = self.dispatch_lock.lock().await;
        let chain: Vec<MiddlewareFn> = self
            .entries
            .lock()
            .iter()
            .map(|(_, mw)| Arc::clone(mw))
            .collect();

        let terminal: Terminal = Box::new(move || terminal().boxed());
        Next::new(ctx, chain, terminal).run().await
    }
}

impl fmt::Debug for MiddlewarePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewarePipeline")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReplyResult;
    use crate::message::{BaseMessage, MessageElement, MessageKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Dummy(BaseMessage);

    #[async_trait]
    impl MessageContext for Dummy {
        fn protocol(&self) -> &str {
            "test"
        }

        fn text(&self) -> String {
            self.0.content.clone()
        }

        fn sender_id(&self) -> &str {
            "0"
        }

        fn message(&self) -> &BaseMessage {
            &self.0
        }

        async fn reply(&self, _elements: Vec<MessageElement>) -> ReplyResult<BaseMessage> {
            Ok(self.0.clone())
        }
    }

    fn ctx() -> Arc<dyn MessageContext> {
        Arc::new(Dummy(BaseMessage::text(MessageKind::Direct, "1", "hi")))
    }

    fn tagged(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> MiddlewareFn {
        let log = Arc::clone(log);
        middleware_fn(move |_, next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(format!("{tag}>"));
                next.run().await?;
                log.lock().push(format!("<{tag}"));
                Ok(())
            }
        })
    }

    fn terminal(
        log: &Arc<Mutex<Vec<String>>>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send + 'static {
        let log = Arc::clone(log);
        move || {
            async move {
                log.lock().push("terminal".to_string());
                Ok(())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_onion_order_with_prepend() {
        let pipeline = MiddlewarePipeline::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        pipeline.add_boxed(tagged(&log, "a"), false);
        pipeline.add_boxed(tagged(&log, "b"), false);
        pipeline.add_boxed(tagged(&log, "first"), true);

        pipeline.dispatch(ctx(), terminal(&log)).await.unwrap();
        assert_eq!(
            *log.lock(),
            vec!["first>", "a>", "b>", "terminal", "<b", "<a", "<first"]
        );
    }

    #[tokio::test]
    async fn test_terminal_runs_once_even_if_next_called_twice() {
        let pipeline = MiddlewarePipeline::new();
        let runs = Arc::new(AtomicUsize::new(0));
        pipeline.add(
            |_, next| async move {
                next.run().await?;
                next.run().await?;
                Ok(())
            },
            false,
        );

        let r = Arc::clone(&runs);
        pipeline
            .dispatch(ctx(), move || async move {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_terminal() {
        let pipeline = MiddlewarePipeline::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        pipeline.add(|_, _next| async { Ok(()) }, false);
        pipeline.dispatch(ctx(), terminal(&log)).await.unwrap();
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_extras_apply_to_current_dispatch_only() {
        let pipeline = MiddlewarePipeline::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let extra = tagged(&log, "extra");
        pipeline.add(
            move |_, next| {
                let extra = Arc::clone(&extra);
                async move { next.run_with([extra]).await }
            },
            false,
        );

        pipeline.dispatch(ctx(), terminal(&log)).await.unwrap();
        pipeline.dispatch(ctx(), terminal(&log)).await.unwrap();
        assert_eq!(
            *log.lock(),
            vec!["extra>", "terminal", "<extra", "extra>", "terminal", "<extra"]
        );
        assert_eq!(pipeline.len(), 1);
    }

    #[tokio::test]
    async fn test_error_aborts_chain() {
        let pipeline = MiddlewarePipeline::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        pipeline.add(|_, _| async { Err::<(), BoxError>("denied".into()) }, false);
        pipeline.add_boxed(tagged(&log, "inner"), false);

        let err = pipeline.dispatch(ctx(), terminal(&log)).await.unwrap_err();
        assert_eq!(err.to_string(), "denied");
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dispose_removes_middleware() {
        let pipeline = MiddlewarePipeline::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let d = pipeline.add_boxed(tagged(&log, "a"), false);
        d.dispose();
        d.dispose();
        assert!(pipeline.is_empty());

        pipeline.dispatch(ctx(), terminal(&log)).await.unwrap();
        assert_eq!(*log.lock(), vec!["terminal"]);
    }

    #[tokio::test]
    async fn test_dispose_does_not_affect_in_flight_dispatch() {
        let pipeline = MiddlewarePipeline::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let later: Arc<Mutex<Option<Disposer>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&later);
        pipeline.add(
            move |_, next| {
                if let Some(d) = slot.lock().as_ref() {
                    d.dispose();
                }
                async move { next.run().await }
            },
            false,
        );
        *later.lock() = Some(pipeline.add_boxed(tagged(&log, "later"), false));
        assert_eq!(pipeline.len(), 2);

        pipeline.dispatch(ctx(), terminal(&log)).await.unwrap();
        assert_eq!(*log.lock(), vec!["later>", "terminal", "<later"]);
        assert_eq!(pipeline.len(), 1);

        pipeline.dispatch(ctx(), terminal(&log)).await.unwrap();
        assert_eq!(
            *log.lock(),
            vec!["later>", "terminal", "<later", "terminal"]
        );
    }

    #[tokio::test]
    async fn test_dispatches_are_serialized() {
        let pipeline = Arc::new(MiddlewarePipeline::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        pipeline.add(
            move |_, next| {
                let (a, p) = (Arc::clone(&a), Arc::clone(&p));
                async move {
                    let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    a.fetch_sub(1, Ordering::SeqCst);
                    next.run().await
                }
            },
            false,
        );

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let pipeline = Arc::clone(&pipeline);
            tasks.push(tokio::spawn(async move {
                pipeline.dispatch(ctx(), || async { Ok(()) }).await.unwrap();
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
