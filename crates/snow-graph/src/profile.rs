//! Author and mention identities, with per-author report aggregation.
//!
//! Profile metadata (names, pictures, nip05) is resolved elsewhere; the
//! graph only tracks the identity itself and the reports filed against it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use nostr_sdk::PublicKey;
use parking_lot::RwLock;

use crate::note::Note;

/// A pubkey the graph has seen as author, mention target, or report
/// subject. Equality and hashing are by pubkey.
pub struct Profile {
    pubkey: PublicKey,
    reports: RwLock<HashMap<PublicKey, HashSet<Arc<Note>>>>,
}

impl Profile {
    pub(crate) fn new(pubkey: PublicKey) -> Arc<Self> {
        Arc::new(Self {
            pubkey,
            reports: RwLock::new(HashMap::new()),
        })
    }

    pub fn pubkey(&self) -> PublicKey {
        self.pubkey
    }

    /// Record a report filed against this profile, keyed by the reporting
    /// author. Distinct reports from the same author accumulate; an
    /// identical report is a no-op.
    pub(crate) fn add_report(&self, report: Arc<Note>) -> bool {
        let Some(author) = report.author_pubkey() else {
            return false;
        };
        self.reports.write().entry(author).or_default().insert(report)
    }

    /// Reports filed against this profile by `author`.
    pub fn reports_by(&self, author: &PublicKey) -> HashSet<Arc<Note>> {
        self.reports.read().get(author).cloned().unwrap_or_default()
    }

    /// Total number of reports filed against this profile.
    pub fn report_count(&self) -> usize {
        self.reports.read().values().map(HashSet::len).sum()
    }

    /// True when any report against this profile was created after
    /// `cutoff` (unix seconds).
    pub fn reported_since(&self, cutoff: u64) -> bool {
        self.reports
            .read()
            .values()
            .flatten()
            .any(|report| report.created_at().map(|t| t > cutoff).unwrap_or(false))
    }
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.pubkey == other.pubkey
    }
}

impl Eq for Profile {}

impl Hash for Profile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pubkey.hash(state);
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("pubkey", &self.pubkey)
            .field("report_count", &self.report_count())
            .finish()
    }
}
