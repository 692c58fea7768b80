//! Removal handles returned by every registration call.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A handle that removes one registration (event handler, middleware,
/// command) when disposed.
///
/// Disposers are cheap to clone; all clones share the same state, so the
/// removal runs at most once no matter how many times or from where
/// [`dispose`](Self::dispose) is called. Disposing from inside the handler
/// being removed is allowed.
#[derive(Clone)]
pub struct Disposer {
    inner: Arc<Inner>,
}

struct Inner {
    disposed: AtomicBool,
    release: Box<dyn Fn() + Send + Sync>,
}

impl Disposer {
    /// Wraps a removal function.
    pub fn new(release: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                disposed: AtomicBool::new(false),
                release: Box::new(release),
            }),
        }
    }

    /// A disposer that does nothing.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Combines several disposers into one that disposes them all in order.
    pub fn all(disposers: impl IntoIterator<Item = Disposer>) -> Self {
        let disposers: Vec<Disposer> = disposers.into_iter().collect();
        Self::new(move || {
            for d in &disposers {
                d.dispose();
            }
        })
    }

    /// Runs the removal if it has not run yet.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            (self.inner.release)();
        }
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_dispose_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let d = Disposer::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let d2 = d.clone();

        d.dispose();
        d2.dispose();
        d.dispose();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(d2.is_disposed());
    }

    #[test]
    fn test_all_disposes_each() {
        let count = Arc::new(AtomicUsize::new(0));
        let make = || {
            let c = Arc::clone(&count);
            Disposer::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
        };
        let combined = Disposer::all([make(), make(), Disposer::noop(), make()]);
        combined.dispose();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
