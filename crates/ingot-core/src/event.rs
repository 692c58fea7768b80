//! Named publish/subscribe event bus.
//!
//! Events are identified by name (`"message"`, `"command"`, or anything a
//! plugin registers). Each name owns a bucket of subscribers kept in
//! subscription order. Emitting an event snapshots the bucket under its lock
//! and then awaits every subscriber in turn without holding the lock, so
//! subscribers may freely subscribe, unsubscribe or dispose themselves while
//! being called.
//!
//! # Example
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! bus.register("greet");
//! let disposer = bus.on("greet", |payload| async move {
//!     if let Some(name) = payload.downcast_ref::<String>() {
//!         println!("hello, {name}");
//!     }
//!     Ok(())
//! })?;
//! bus.emit("greet", EventPayload::new("world".to_string())).await?;
//! disposer.dispose();
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::dispose::Disposer;
use crate::error::{BoxError, EventError, EventResult};

/// Type-erased event payload.
///
/// Cloning is cheap; every subscriber of one emission sees the same value.
#[derive(Clone)]
pub struct EventPayload(Arc<dyn Any + Send + Sync>);

impl EventPayload {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrows the payload as `T` if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Like [`downcast_ref`](Self::downcast_ref), but reports a mismatch as an
    /// [`EventError::PayloadMismatch`].
    pub fn expect<T: Any>(&self) -> EventResult<&T> {
        self.downcast_ref::<T>()
            .ok_or(EventError::PayloadMismatch {
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl fmt::Debug for EventPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventPayload").finish_non_exhaustive()
    }
}

/// A stored event subscriber.
pub type EventCallback =
    Arc<dyn Fn(EventPayload) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

struct Subscriber {
    id: Uuid,
    callback: EventCallback,
}

#[derive(Default)]
struct Bucket {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Bucket {
    fn remove(&self, id: Uuid) {
        self.subscribers.lock().retain(|s| s.id != id);
    }

    fn snapshot(&self) -> Vec<EventCallback> {
        self.subscribers
            .lock()
            .iter()
            .map(|s| Arc::clone(&s.callback))
            .collect()
    }
}

/// The named event registry.
///
/// `EventBus` is `Send + Sync`; share it behind an `Arc`.
#[derive(Default)]
pub struct EventBus {
    buckets: RwLock<HashMap<String, Arc<Bucket>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty bucket for `name`. Registering an existing name keeps
    /// its current subscribers.
    pub fn register(&self, name: impl Into<String>) {
        let name = name.into();
        let mut buckets = self.buckets.write();
        if !buckets.contains_key(&name) {
            debug!(event = %name, "Registered event");
            buckets.insert(name, Arc::new(Bucket::default()));
        }
    }

    /// Removes the bucket for `name` together with all of its subscribers.
    ///
    /// Disposers handed out for the removed bucket become no-ops, even if the
    /// name is registered again later.
    pub fn unregister(&self, name: &str) {
        if self.buckets.write().remove(name).is_some() {
            debug!(event = %name, "Unregistered event");
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.buckets.read().contains_key(name)
    }

    /// Number of current subscribers of `name` (0 if unregistered).
    pub fn handler_count(&self, name: &str) -> usize {
        self.bucket(name)
            .map(|b| b.subscribers.lock().len())
            .unwrap_or(0)
    }

    /// Subscribes an async callback to `name`.
    ///
    /// Fails with [`EventError::NotRegistered`] if `name` was never
    /// registered.
    pub fn on<F, Fut>(&self, name: &str, callback: F) -> EventResult<Disposer>
    where
        F: Fn(EventPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.on_boxed(name, Arc::new(move |payload| callback(payload).boxed()))
    }

    /// Subscribes an already type-erased callback.
    pub fn on_boxed(&self, name: &str, callback: EventCallback) -> EventResult<Disposer> {
        let bucket = self
            .bucket(name)
            .ok_or_else(|| EventError::not_registered(name))?;

        let id = Uuid::new_v4();
        bucket.subscribers.lock().push(Subscriber { id, callback });
        trace!(event = %name, %id, "Subscribed handler");

        let weak: Weak<Bucket> = Arc::downgrade(&bucket);
        Ok(Disposer::new(move || {
            if let Some(bucket) = weak.upgrade() {
                bucket.remove(id);
            }
        }))
    }

    /// Calls every current subscriber of `name` in subscription order.
    ///
    /// Stops at the first subscriber error and returns it. Subscribers removed
    /// while the emission is running are still called for this emission.
    pub async fn emit(&self, name: &str, payload: EventPayload) -> EventResult<()> {
        let bucket = self
            .bucket(name)
            .ok_or_else(|| EventError::not_registered(name))?;
        let callbacks = bucket.snapshot();
        drop(bucket);

        trace!(event = %name, handlers = callbacks.len(), "Emitting event");
        for callback in callbacks {
            callback(payload.clone())
                .await
                .map_err(|source| EventError::Handler {
                    event: name.to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    fn bucket(&self, name: &str) -> Option<Arc<Bucket>> {
        self.buckets.read().get(name).cloned()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buckets = self.buckets.read();
        let mut names: Vec<&String> = buckets.keys().collect();
        names.sort();
        f.debug_struct("EventBus").field("events", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, Arc<Mutex<Vec<&'static str>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Arc::clone(&log), log)
    }

    #[tokio::test]
    async fn test_on_unregistered_fails() {
        let bus = EventBus::new();
        let err = bus.on("missing", |_| async { Ok(()) }).unwrap_err();
        assert!(matches!(err, EventError::NotRegistered { ref name } if name == "missing"));

        let err = bus.emit("missing", EventPayload::new(())).await.unwrap_err();
        assert!(matches!(err, EventError::NotRegistered { .. }));
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let bus = EventBus::new();
        bus.register("message");
        let _d = bus.on("message", |_| async { Ok(()) }).unwrap();
        bus.register("message");
        assert_eq!(bus.handler_count("message"), 1);
    }

    #[tokio::test]
    async fn test_emit_in_subscription_order() {
        let bus = EventBus::new();
        bus.register("e");
        let (log, out) = recorder();
        for tag in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            bus.on("e", move |_| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().push(tag);
                    Ok(())
                }
            })
            .unwrap();
        }

        bus.emit("e", EventPayload::new(())).await.unwrap();
        assert_eq!(*out.lock(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_emit_stops_at_first_error() {
        let bus = EventBus::new();
        bus.register("e");
        let calls = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&calls);
        bus.on("e", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), BoxError>("boom".into()) }
        })
        .unwrap();
        let c = Arc::clone(&calls);
        bus.on("e", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .unwrap();

        let err = bus.emit("e", EventPayload::new(())).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_payload_downcast() {
        let bus = EventBus::new();
        bus.register("e");
        let seen = Arc::new(Mutex::new(String::new()));
        let s = Arc::clone(&seen);
        bus.on("e", move |payload| {
            let s = Arc::clone(&s);
            async move {
                let text = payload.expect::<String>()?;
                *s.lock() = text.clone();
                Ok(())
            }
        })
        .unwrap();

        bus.emit("e", EventPayload::new("hi".to_string())).await.unwrap();
        assert_eq!(*seen.lock(), "hi");

        let err = bus.emit("e", EventPayload::new(5u8)).await.unwrap_err();
        assert!(err.to_string().contains("payload mismatch"));
    }

    #[tokio::test]
    async fn test_dispose_from_inside_own_handler() {
        let bus = EventBus::new();
        bus.register("e");
        let calls = Arc::new(AtomicUsize::new(0));
        let slot: Arc<OnceLock<Disposer>> = Arc::new(OnceLock::new());

        let c = Arc::clone(&calls);
        let s = Arc::clone(&slot);
        let disposer = bus
            .on("e", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                if let Some(d) = s.get() {
                    d.dispose();
                }
                async { Ok(()) }
            })
            .unwrap();
        slot.set(disposer).unwrap();

        bus.emit("e", EventPayload::new(())).await.unwrap();
        bus.emit("e", EventPayload::new(())).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count("e"), 0);
    }

    #[tokio::test]
    async fn test_dispose_does_not_affect_in_flight_emit() {
        let bus = EventBus::new();
        bus.register("e");
        let (log, out) = recorder();
        let second: Arc<OnceLock<Disposer>> = Arc::new(OnceLock::new());

        let l = Arc::clone(&log);
        let s = Arc::clone(&second);
        bus.on("e", move |_| {
            l.lock().push("first");
            if let Some(d) = s.get() {
                d.dispose();
            }
            async { Ok(()) }
        })
        .unwrap();
        let l = Arc::clone(&log);
        let d = bus
            .on("e", move |_| {
                l.lock().push("second");
                async { Ok(()) }
            })
            .unwrap();
        second.set(d).unwrap();

        bus.emit("e", EventPayload::new(())).await.unwrap();
        bus.emit("e", EventPayload::new(())).await.unwrap();
        assert_eq!(*out.lock(), vec!["first", "second", "first"]);
    }

    #[tokio::test]
    async fn test_unregister_drops_subscribers() {
        let bus = EventBus::new();
        bus.register("e");
        let d = bus.on("e", |_| async { Ok(()) }).unwrap();
        bus.unregister("e");
        assert!(!bus.is_registered("e"));

        bus.register("e");
        let _keep = bus.on("e", |_| async { Ok(()) }).unwrap();
        d.dispose();
        assert_eq!(bus.handler_count("e"), 1);
    }
}
