//! Tuning for the note graph's notification pipeline.

use serde::{Deserialize, Serialize};

/// Debounce windows and walk limits for a [`NoteGraph`](crate::NoteGraph).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphConfig {
    /// Quiet window for per-note observers and the change bus, in
    /// milliseconds.
    #[serde(default = "default_note_debounce_ms")]
    pub note_debounce_ms: u64,

    /// Quiet window for feed aggregators, in milliseconds.
    #[serde(default = "default_feed_debounce_ms")]
    pub feed_debounce_ms: u64,

    /// Broadcast capacity per observable. Slow subscribers skip missed
    /// snapshots and catch up on the next one.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Ancestor-walk depth cap. Chains deeper than this, and reference
    /// cycles, are treated as thread roots.
    #[serde(default = "default_max_thread_depth")]
    pub max_thread_depth: usize,
}

fn default_note_debounce_ms() -> u64 {
    100
}

fn default_feed_debounce_ms() -> u64 {
    1000
}

fn default_channel_capacity() -> usize {
    64
}

fn default_max_thread_depth() -> usize {
    200
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            note_debounce_ms: default_note_debounce_ms(),
            feed_debounce_ms: default_feed_debounce_ms(),
            channel_capacity: default_channel_capacity(),
            max_thread_depth: default_max_thread_depth(),
        }
    }
}
