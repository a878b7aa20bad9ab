//! In-memory Nostr note relationship graph for Snowclaw.
//!
//! Events arrive continuously, concurrently, and out of order; this crate
//! keeps one [`Note`] per event id, merges related events (replies,
//! reactions, reposts, reports, zaps, relay sightings) idempotently into
//! per-note relationship sets, and coalesces the resulting change signals
//! so downstream views refresh once per burst instead of once per event.
//!
//! The graph itself is non-persistent and single-process; transport,
//! signature validation, profile metadata, and ranking live elsewhere and
//! talk to this crate through [`NoteGraph::merge`], [`FeedSource`], and
//! [`WatchScope`].

pub mod config;
pub mod feed;
pub mod graph;
pub mod note;
pub mod observable;
pub mod profile;

// Re-export commonly used types
pub use config::GraphConfig;
pub use feed::{FeedAggregator, FeedSource, FeedState};
pub use graph::{GraphStats, NoteGraph};
pub use note::{Note, NoteSnapshot};
pub use observable::{Debounced, Subscription, WatchScope};
pub use profile::Profile;

// Re-export nostr-sdk for convenience
pub use nostr_sdk;
