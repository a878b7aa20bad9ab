//! Feed aggregation: one ranked query's continuously refreshed snapshot.
//!
//! An aggregator never recomputes per incoming event. Graph change
//! broadcasts only (re)arm its debounce window; when the window elapses,
//! one pull against the query collaborator happens and the result is
//! diffed cheaply before anyone is notified.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::graph::NoteGraph;
use crate::observable::{Debounced, Subscription};

/// The ranked/filtered query collaborator behind a feed.
pub trait FeedSource: Send + Sync + 'static {
    type Item: Clone + PartialEq + Send + Sync + 'static;

    /// Pull the current top of the feed, best first.
    fn load_top(&self) -> Vec<Self::Item>;
}

/// Displayable state of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState<T> {
    /// No refresh has completed yet.
    Loading,
    /// The last refresh returned nothing.
    Empty,
    /// The last meaningful snapshot, best first.
    Loaded(Vec<T>),
}

struct FeedInner<S: FeedSource> {
    source: S,
    state: RwLock<FeedState<S::Item>>,
    live: Debounced<FeedState<S::Item>>,
    closed: AtomicBool,
}

impl<S: FeedSource> FeedInner<S> {
    /// Pull and diff. Returns the new state when it changed, `None` when
    /// the pull was discarded.
    fn refresh_now(&self) -> Option<FeedState<S::Item>> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        let fresh = self.source.load_top();
        let mut state = self.state.write();
        if fresh.is_empty() {
            if matches!(*state, FeedState::Empty) {
                return None;
            }
            *state = FeedState::Empty;
            return Some(FeedState::Empty);
        }
        if let FeedState::Loaded(current) = &*state {
            // Same length and same head: assume unchanged, skip the full
            // swap. Trades a rare missed update for per-poll diff cost.
            if current.len() == fresh.len() && current.first() == fresh.first() {
                debug!(len = fresh.len(), "feed pull unchanged, discarding");
                return None;
            }
        }
        *state = FeedState::Loaded(fresh);
        Some(state.clone())
    }
}

/// Keeps one query's snapshot fresh from graph change broadcasts.
///
/// Subscribes to the graph's change bus on construction; [`close`]
/// (also run on drop) detaches it again, so no subscription or pending
/// refresh survives teardown.
///
/// [`close`]: FeedAggregator::close
pub struct FeedAggregator<S: FeedSource> {
    inner: Arc<FeedInner<S>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<S: FeedSource> FeedAggregator<S> {
    /// Wire `source`'s query to `graph`'s change bus. Must be called
    /// inside a Tokio runtime.
    pub fn new(graph: &Arc<NoteGraph>, source: S) -> Self {
        let cfg = graph.config();
        let delay = Duration::from_millis(cfg.feed_debounce_ms);
        let capacity = cfg.channel_capacity;
        let inner = Arc::new_cyclic(|weak: &Weak<FeedInner<S>>| {
            let weak = weak.clone();
            let live = Debounced::new(delay, capacity, move || {
                weak.upgrade().and_then(|inner| inner.refresh_now())
            });
            FeedInner {
                source,
                state: RwLock::new(FeedState::Loading),
                live,
                closed: AtomicBool::new(false),
            }
        });

        let mut bus = graph.subscribe_changes();
        let weak = Arc::downgrade(&inner);
        let listener = tokio::spawn(async move {
            while bus.recv().await.is_some() {
                match weak.upgrade() {
                    Some(inner) => inner.live.invalidate(),
                    None => break,
                }
            }
        });

        Self {
            inner,
            listener: Mutex::new(Some(listener)),
        }
    }

    pub fn state(&self) -> FeedState<S::Item> {
        self.inner.state.read().clone()
    }

    /// Subscribe to refreshed snapshots.
    pub fn subscribe(&self) -> Subscription<FeedState<S::Item>> {
        self.inner.live.subscribe()
    }

    /// Re-pull right now, skipping the quiet window. Subscribers are
    /// notified only if the snapshot actually changed.
    pub fn refresh(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Some(state) = inner.refresh_now() {
                inner.live.publish(state);
            }
        });
    }

    /// Detach from the change bus and stop refreshing. Idempotent; also
    /// run on drop.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
    }
}

impl<S: FeedSource> Drop for FeedAggregator<S> {
    fn drop(&mut self) {
        self.close();
    }
}
