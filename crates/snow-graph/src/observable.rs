//! Debounced observables: coalesce a burst of change signals into one
//! delayed notification carrying the state at flush time.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::trace;

/// Registrar told when an observable gains its first subscriber and loses
/// its last one. Lets the owning system scope network subscriptions to
/// what is actually being watched.
pub trait WatchScope: Send + Sync {
    fn watch(&self, key: &str);
    fn unwatch(&self, key: &str);
}

type Source<T> = dyn Fn() -> Option<T> + Send + Sync;

/// Converts an arbitrary-rate stream of [`invalidate`](Debounced::invalidate)
/// calls into at most one notification per quiet window.
///
/// The first invalidation arms a timer; further invalidations within the
/// window are no-ops. When the timer fires, the source closure is asked
/// for a fresh snapshot, which is broadcast to every subscriber. The
/// payload reflects the state at flush time, not at the first
/// invalidation, so coalescing never loses the final state.
pub struct Debounced<T: Clone + Send + 'static> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    delay: Duration,
    pending: AtomicBool,
    watchers: AtomicUsize,
    tx: broadcast::Sender<T>,
    source: Box<Source<T>>,
    scope: Option<ScopeHook>,
}

struct ScopeHook {
    registrar: Arc<dyn WatchScope>,
    key: String,
}

impl<T: Clone + Send + 'static> Debounced<T> {
    /// Observable with the given quiet window and snapshot source. The
    /// source returns `None` when there is nothing worth publishing.
    pub fn new<F>(delay: Duration, capacity: usize, source: F) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        Self::build(delay, capacity, Box::new(source), None)
    }

    /// Like [`Debounced::new`], with a registrar that is told when `key`
    /// starts and stops being watched.
    pub fn scoped<F>(
        delay: Duration,
        capacity: usize,
        source: F,
        registrar: Arc<dyn WatchScope>,
        key: impl Into<String>,
    ) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        let hook = ScopeHook {
            registrar,
            key: key.into(),
        };
        Self::build(delay, capacity, Box::new(source), Some(hook))
    }

    fn build(
        delay: Duration,
        capacity: usize,
        source: Box<Source<T>>,
        scope: Option<ScopeHook>,
    ) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                delay,
                pending: AtomicBool::new(false),
                watchers: AtomicUsize::new(0),
                tx,
                source,
                scope,
            }),
        }
    }

    /// Signal that the observed state changed. Returns immediately.
    ///
    /// With no subscribers this is a no-op. Otherwise the first call in an
    /// idle window arms the flush timer (this requires a Tokio runtime);
    /// every further call within the window is absorbed by the already
    /// armed timer.
    pub fn invalidate(&self) {
        if self.shared.watchers.load(Ordering::Acquire) == 0 {
            return;
        }
        if self.shared.pending.swap(true, Ordering::AcqRel) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(shared.delay).await;
            shared.pending.store(false, Ordering::Release);
            if shared.watchers.load(Ordering::Acquire) == 0 {
                return;
            }
            if let Some(snapshot) = (shared.source)() {
                // Fails only when every receiver is already gone.
                let _ = shared.tx.send(snapshot);
            }
        });
    }

    /// Publish a snapshot right now, bypassing the quiet window. Used for
    /// explicitly requested refreshes.
    pub fn publish(&self, snapshot: T) {
        let _ = self.shared.tx.send(snapshot);
    }

    /// Attach a subscriber. The first subscription registers the watch
    /// scope; dropping the last one deregisters it.
    pub fn subscribe(&self) -> Subscription<T> {
        let rx = self.shared.tx.subscribe();
        if self.shared.watchers.fetch_add(1, Ordering::AcqRel) == 0 {
            if let Some(hook) = &self.shared.scope {
                hook.registrar.watch(&hook.key);
            }
        }
        Subscription {
            rx,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Number of attached subscribers.
    pub fn watcher_count(&self) -> usize {
        self.shared.watchers.load(Ordering::Acquire)
    }
}

/// RAII handle to a [`Debounced`] subscription. Dropping it detaches the
/// subscriber; a flush that fires afterwards publishes to no one.
pub struct Subscription<T: Clone + Send + 'static> {
    rx: broadcast::Receiver<T>,
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    /// Wait for the next published snapshot. Skips over snapshots missed
    /// while lagging; returns `None` only if the observable is gone.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(skipped, "subscriber lagged, catching up");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll for a pending snapshot.
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

impl<T: Clone + Send + 'static> Drop for Subscription<T> {
    fn drop(&mut self) {
        if self.shared.watchers.fetch_sub(1, Ordering::AcqRel) == 1 {
            if let Some(hook) = &self.shared.scope {
                hook.registrar.unwatch(&hook.key);
            }
        }
    }
}
