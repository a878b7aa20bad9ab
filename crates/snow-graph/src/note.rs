//! The graph's leaf: one content-addressed event and the relationships
//! observed around it.
//!
//! A [`Note`] starts as a placeholder (identity only) so that replies,
//! reactions and zaps can reference events that have not arrived yet. The
//! core payload is set at most once by the graph store; relationship sets
//! only ever grow, and every real insertion schedules a debounced
//! notification on the note's observable.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock, OnceLock, Weak};
use std::time::Duration;

use chrono::DateTime;
use nostr_sdk::{Event, EventId, Kind, PublicKey, Timestamp};
use parking_lot::RwLock;
use regex::Regex;
use tracing::debug;

use crate::config::GraphConfig;
use crate::graph::NoteGraph;
use crate::observable::{Debounced, WatchScope};
use crate::profile::Profile;

/// Inline citation marker: `#[3]` points at the event's fourth tag.
static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\s|\A)#\[([0-9]+)\]").unwrap());

/// Boosts older than this no longer count for [`Note::has_boosted`].
const BOOST_WINDOW_SECS: u64 = 5 * 60;

/// Reports against an author stay fresh for this long.
const REPORT_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Core payload of a materialized note. Set at most once, immutable after.
struct NoteBody {
    event: Event,
    author: Arc<Profile>,
    mentions: Vec<Arc<Profile>>,
    reply_to: Vec<Arc<Note>>,
}

/// Relationship sets. Grow-only; the graph store is the only writer.
#[derive(Default)]
struct Relations {
    replies: HashSet<Arc<Note>>,
    reactions: HashSet<Arc<Note>>,
    boosts: HashSet<Arc<Note>>,
    reports: HashMap<PublicKey, HashSet<Arc<Note>>>,
    zaps: HashMap<Arc<Note>, Option<Arc<Note>>>,
    relays: HashSet<String>,
}

/// One content-addressed event plus everything observed around it.
pub struct Note {
    id: EventId,
    max_thread_depth: usize,
    body: OnceLock<NoteBody>,
    channel: OnceLock<Arc<Note>>,
    relations: RwLock<Relations>,
    live: Debounced<NoteSnapshot>,
}

/// Immutable per-note view published to observers.
#[derive(Debug, Clone)]
pub struct NoteSnapshot {
    pub id: EventId,
    pub event: Option<Event>,
    pub author: Option<PublicKey>,
    pub reply_count: usize,
    pub reaction_count: usize,
    pub boost_count: usize,
    pub zap_count: usize,
    pub report_count: usize,
    pub zapped_amount_msats: u64,
    pub relays: Vec<String>,
}

impl Note {
    pub(crate) fn new(
        id: EventId,
        cfg: &GraphConfig,
        scope: Option<Arc<dyn WatchScope>>,
    ) -> Arc<Self> {
        let delay = Duration::from_millis(cfg.note_debounce_ms);
        let capacity = cfg.channel_capacity;
        let max_thread_depth = cfg.max_thread_depth;
        Arc::new_cyclic(|weak: &Weak<Note>| {
            let weak = weak.clone();
            let source = move || weak.upgrade().map(|note| note.snapshot());
            let live = match scope {
                Some(registrar) => {
                    Debounced::scoped(delay, capacity, source, registrar, id.to_hex())
                }
                None => Debounced::new(delay, capacity, source),
            };
            Self {
                id,
                max_thread_depth,
                body: OnceLock::new(),
                channel: OnceLock::new(),
                relations: RwLock::new(Relations::default()),
                live,
            }
        })
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn id_hex(&self) -> String {
        self.id.to_hex()
    }

    /// The parsed event, once materialized.
    pub fn event(&self) -> Option<&Event> {
        self.body.get().map(|body| &body.event)
    }

    pub fn author(&self) -> Option<Arc<Profile>> {
        self.body.get().map(|body| Arc::clone(&body.author))
    }

    pub fn author_pubkey(&self) -> Option<PublicKey> {
        self.body.get().map(|body| body.author.pubkey())
    }

    pub fn mentions(&self) -> Vec<Arc<Profile>> {
        self.body
            .get()
            .map(|body| body.mentions.clone())
            .unwrap_or_default()
    }

    /// Ancestor chain, nearest-last, as carried by the event's references.
    pub fn reply_to(&self) -> Vec<Arc<Note>> {
        self.body
            .get()
            .map(|body| body.reply_to.clone())
            .unwrap_or_default()
    }

    pub fn is_materialized(&self) -> bool {
        self.body.get().is_some()
    }

    pub fn created_at(&self) -> Option<u64> {
        self.event().map(|event| event.created_at.as_secs())
    }

    pub fn kind(&self) -> Option<Kind> {
        self.event().map(|event| event.kind)
    }

    /// The containing channel's note, for channel messages.
    pub fn channel(&self) -> Option<Arc<Note>> {
        self.channel.get().cloned()
    }

    /// Observable handle for this note's debounced state notifications.
    pub fn live(&self) -> &Debounced<NoteSnapshot> {
        &self.live
    }

    // ── Mutation, graph-store only ───────────────────────────────────

    /// One-time transition from placeholder to fully populated. Returns
    /// false (and changes nothing) if another delivery won the race.
    pub(crate) fn materialize(
        &self,
        event: Event,
        author: Arc<Profile>,
        mentions: Vec<Arc<Profile>>,
        reply_to: Vec<Arc<Note>>,
    ) -> bool {
        let body = NoteBody {
            event,
            author,
            mentions,
            reply_to,
        };
        let fresh = self.body.set(body).is_ok();
        if fresh {
            debug!(id = %self.id, "materialized note");
            self.live.invalidate();
        }
        fresh
    }

    pub(crate) fn set_channel(&self, channel: Arc<Note>) -> bool {
        let fresh = self.channel.set(channel).is_ok();
        if fresh {
            self.live.invalidate();
        }
        fresh
    }

    pub(crate) fn add_reply(&self, note: Arc<Note>) -> bool {
        let inserted = self.relations.write().replies.insert(note);
        if inserted {
            self.live.invalidate();
        }
        inserted
    }

    pub(crate) fn add_reaction(&self, note: Arc<Note>) -> bool {
        let inserted = self.relations.write().reactions.insert(note);
        if inserted {
            self.live.invalidate();
        }
        inserted
    }

    pub(crate) fn add_boost(&self, note: Arc<Note>) -> bool {
        let inserted = self.relations.write().boosts.insert(note);
        if inserted {
            self.live.invalidate();
        }
        inserted
    }

    /// Keyed by the reporting author. The membership check is against the
    /// specific report note, so a second distinct report from the same
    /// author still accumulates.
    pub(crate) fn add_report(&self, report: Arc<Note>) -> bool {
        let Some(author) = report.author_pubkey() else {
            return false;
        };
        let inserted = self
            .relations
            .write()
            .reports
            .entry(author)
            .or_default()
            .insert(report);
        if inserted {
            self.live.invalidate();
        }
        inserted
    }

    /// Two-phase zap merge: a bare request is recorded with no receipt; a
    /// later receipt attaches to the existing entry. A completed pair is
    /// never downgraded.
    pub(crate) fn add_zap(&self, request: Arc<Note>, receipt: Option<Arc<Note>>) -> bool {
        let mut relations = self.relations.write();
        let changed = match relations.zaps.get(&request) {
            None => {
                relations.zaps.insert(request, receipt);
                true
            }
            Some(None) if receipt.is_some() => {
                relations.zaps.insert(request, receipt);
                true
            }
            _ => false,
        };
        drop(relations);
        if changed {
            self.live.invalidate();
        }
        changed
    }

    pub(crate) fn add_relay(&self, url: &str) -> bool {
        let inserted = self.relations.write().relays.insert(url.to_string());
        if inserted {
            self.live.invalidate();
        }
        inserted
    }

    // ── Relationship views ───────────────────────────────────────────

    pub fn replies(&self) -> Vec<Arc<Note>> {
        self.relations.read().replies.iter().cloned().collect()
    }

    pub fn reactions(&self) -> Vec<Arc<Note>> {
        self.relations.read().reactions.iter().cloned().collect()
    }

    pub fn boosts(&self) -> Vec<Arc<Note>> {
        self.relations.read().boosts.iter().cloned().collect()
    }

    pub fn zaps(&self) -> HashMap<Arc<Note>, Option<Arc<Note>>> {
        self.relations.read().zaps.clone()
    }

    pub fn reports(&self) -> HashMap<PublicKey, HashSet<Arc<Note>>> {
        self.relations.read().reports.clone()
    }

    pub fn relays(&self) -> Vec<String> {
        self.relations.read().relays.iter().cloned().collect()
    }

    pub fn reply_count(&self) -> usize {
        self.relations.read().replies.len()
    }

    pub fn reaction_count(&self) -> usize {
        self.relations.read().reactions.len()
    }

    pub fn boost_count(&self) -> usize {
        self.relations.read().boosts.len()
    }

    pub fn zap_count(&self) -> usize {
        self.relations.read().zaps.len()
    }

    pub fn report_count(&self) -> usize {
        self.relations.read().reports.values().map(HashSet::len).sum()
    }

    /// Point-in-time view for rendering.
    pub fn snapshot(&self) -> NoteSnapshot {
        let relations = self.relations.read();
        NoteSnapshot {
            id: self.id,
            event: self.event().cloned(),
            author: self.author_pubkey(),
            reply_count: relations.replies.len(),
            reaction_count: relations.reactions.len(),
            boost_count: relations.boosts.len(),
            zap_count: relations.zaps.len(),
            report_count: relations.reports.values().map(HashSet::len).sum(),
            zapped_amount_msats: relations
                .zaps
                .values()
                .flatten()
                .filter_map(|receipt| receipt.event().and_then(zap_amount_msats))
                .sum(),
            relays: relations.relays.iter().cloned().collect(),
        }
    }

    // ── Derived queries ──────────────────────────────────────────────

    /// Total zapped onto this note, in millisats, over receipts whose
    /// amount could be parsed.
    pub fn zapped_amount_msats(&self) -> u64 {
        self.relations
            .read()
            .zaps
            .values()
            .flatten()
            .filter_map(|receipt| receipt.event().and_then(zap_amount_msats))
            .sum()
    }

    pub fn is_reacted_by(&self, user: &PublicKey) -> bool {
        self.relations
            .read()
            .reactions
            .iter()
            .any(|reaction| reaction.author_pubkey() == Some(*user))
    }

    pub fn is_boosted_by(&self, user: &PublicKey) -> bool {
        self.relations
            .read()
            .boosts
            .iter()
            .any(|boost| boost.author_pubkey() == Some(*user))
    }

    /// Zap requests are authored by the sender, so the request side keys
    /// this test.
    pub fn is_zapped_by(&self, user: &PublicKey) -> bool {
        self.relations
            .read()
            .zaps
            .keys()
            .any(|request| request.author_pubkey() == Some(*user))
    }

    /// Did `user` publish a reaction with exactly this content ("+", …)?
    pub fn has_reacted(&self, user: &PublicKey, content: &str) -> bool {
        self.relations.read().reactions.iter().any(|reaction| {
            reaction.author_pubkey() == Some(*user)
                && reaction
                    .event()
                    .map(|event| event.content == content)
                    .unwrap_or(false)
        })
    }

    /// Did `user` boost this note within the repost-protection window?
    pub fn has_boosted(&self, user: &PublicKey) -> bool {
        let cutoff = Timestamp::now().as_secs().saturating_sub(BOOST_WINDOW_SECS);
        self.relations.read().boosts.iter().any(|boost| {
            boost.author_pubkey() == Some(*user)
                && boost.created_at().map(|t| t > cutoff).unwrap_or(false)
        })
    }

    /// Reports on this note filed by `author`.
    pub fn reports_by(&self, author: &PublicKey) -> HashSet<Arc<Note>> {
        self.relations
            .read()
            .reports
            .get(author)
            .cloned()
            .unwrap_or_default()
    }

    /// Which of `authors` have reported this note.
    pub fn report_authors_among(&self, authors: &HashSet<PublicKey>) -> Vec<PublicKey> {
        self.relations
            .read()
            .reports
            .keys()
            .filter(|author| authors.contains(author))
            .copied()
            .collect()
    }

    /// All reports on this note filed by any of `authors`.
    pub fn reports_from(&self, authors: &HashSet<PublicKey>) -> Vec<Arc<Note>> {
        let relations = self.relations.read();
        relations
            .reports
            .iter()
            .filter(|(author, _)| authors.contains(*author))
            .flat_map(|(_, reports)| reports.iter().cloned())
            .collect()
    }

    /// True when this note carries any report, or its author was reported
    /// within the last 24 hours.
    pub fn has_any_reports(&self) -> bool {
        if !self.relations.read().reports.is_empty() {
            return true;
        }
        let cutoff = Timestamp::now().as_secs().saturating_sub(REPORT_WINDOW_SECS);
        self.author()
            .map(|author| author.reported_since(cutoff))
            .unwrap_or(false)
    }

    /// True for reposts and for notes with no ancestors.
    pub fn is_new_thread(&self) -> bool {
        self.kind() == Some(Kind::Repost) || self.reply_to().is_empty()
    }

    /// Reply depth: 0 for thread roots, deepest-parent depth + 1 otherwise.
    pub fn reply_level(&self) -> usize {
        self.thread_position().0
    }

    /// Sortable thread signature: the formatted timestamp of every note
    /// along the deepest ancestor path, so lexicographic order equals
    /// chronological thread order.
    pub fn reply_level_signature(&self) -> String {
        self.thread_position().1
    }

    /// Iterative ancestor walk with a visited guard. Reference cycles and
    /// chains deeper than the configured cap are treated as thread roots.
    fn thread_position(&self) -> (usize, String) {
        let parents = self.reply_to();
        let created = self.created_at().unwrap_or(0);
        if parents.is_empty() {
            return (0, root_signature(created));
        }

        enum Visit {
            Enter(Arc<Note>),
            Exit(Arc<Note>),
        }

        let mut memo: HashMap<EventId, (usize, String)> = HashMap::new();
        let mut path: HashSet<EventId> = HashSet::new();
        path.insert(self.id);

        let mut stack: Vec<Visit> = parents.iter().cloned().map(Visit::Enter).collect();
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(note) => {
                    if memo.contains_key(&note.id) {
                        continue;
                    }
                    if path.contains(&note.id) || path.len() > self.max_thread_depth {
                        let fallback = (0, root_signature(note.created_at().unwrap_or(0)));
                        memo.insert(note.id, fallback);
                        continue;
                    }
                    path.insert(note.id);
                    stack.push(Visit::Exit(Arc::clone(&note)));
                    for parent in note.reply_to() {
                        stack.push(Visit::Enter(parent));
                    }
                }
                Visit::Exit(note) => {
                    path.remove(&note.id);
                    let entry = thread_entry(
                        &note.reply_to(),
                        note.created_at().unwrap_or(0),
                        &memo,
                    );
                    // A provisional cycle-break entry sticks.
                    memo.entry(note.id).or_insert(entry);
                }
            }
        }

        thread_entry(&parents, created, &memo)
    }

    /// Profiles explicitly cited with inline `#[n]` markers in the
    /// payload. Each unresolvable marker is skipped on its own.
    pub fn cited_profiles(&self, graph: &NoteGraph) -> HashSet<Arc<Profile>> {
        let Some(event) = self.event() else {
            return HashSet::new();
        };
        let mut cited = HashSet::new();
        for caps in CITATION_RE.captures_iter(&event.content) {
            let Ok(index) = caps[1].parse::<usize>() else {
                continue;
            };
            let Some(tag) = event.tags.iter().nth(index) else {
                debug!(id = %self.id, index, "citation index out of range");
                continue;
            };
            let slice = tag.as_slice();
            if slice.first().map(|v| v.as_str()) != Some("p") {
                continue;
            }
            match slice.get(1).map(|hex| PublicKey::from_hex(hex)) {
                Some(Ok(pubkey)) => {
                    cited.insert(graph.get_or_create_profile(pubkey));
                }
                _ => debug!(id = %self.id, index, "citation tag has no valid pubkey"),
            }
        }
        cited
    }

    /// Whether this note directly involves `profile`: authored by them,
    /// citing them inline, or (for reactions and reposts) targeting a
    /// note that does.
    pub fn directly_cites(&self, graph: &NoteGraph, profile: &Arc<Profile>) -> bool {
        if self.author().as_ref() == Some(profile)
            || self.cited_profiles(graph).contains(profile)
        {
            return true;
        }
        if !matches!(self.kind(), Some(Kind::Reaction) | Some(Kind::Repost)) {
            return false;
        }

        let mut visited: HashSet<EventId> = HashSet::new();
        visited.insert(self.id);
        let mut cursor = self.reply_to().last().cloned();
        let mut steps = 0;
        while let Some(note) = cursor {
            if !visited.insert(note.id) || steps >= self.max_thread_depth {
                return false;
            }
            steps += 1;
            if note.author().as_ref() == Some(profile)
                || note.cited_profiles(graph).contains(profile)
            {
                return true;
            }
            if !matches!(note.kind(), Some(Kind::Reaction) | Some(Kind::Repost)) {
                return false;
            }
            cursor = note.reply_to().last().cloned();
        }
        false
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Note {}

impl Hash for Note {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Note")
            .field("id", &self.id)
            .field("materialized", &self.is_materialized())
            .finish_non_exhaustive()
    }
}

/// Millisat amount of a zap receipt: the receipt's own `amount` tag, or
/// the one on the zap request embedded in its `description` tag.
fn zap_amount_msats(event: &Event) -> Option<u64> {
    if let Some(amount) = amount_tag(event) {
        return Some(amount);
    }
    let request = crate::graph::embedded_zap_request(event).ok()?;
    amount_tag(&request)
}

fn amount_tag(event: &Event) -> Option<u64> {
    event.tags.iter().find_map(|tag| {
        let slice = tag.as_slice();
        if slice.first().map(|v| v.as_str()) == Some("amount") {
            slice.get(1)?.parse().ok()
        } else {
            None
        }
    })
}

/// Fixed-width UTC timestamp so signatures sort chronologically.
fn formatted_timestamp(secs: u64) -> String {
    DateTime::from_timestamp(secs as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d-%H:%M:%S").to_string())
        .unwrap_or_else(|| format!("{secs:020}"))
}

// A parent signature is a strict prefix of its children's, and the
// timestamps are fixed-width, so plain lexicographic order walks the
// thread parents-first and siblings chronologically.
fn root_signature(created_at: u64) -> String {
    format!("/{}", formatted_timestamp(created_at))
}

fn child_signature(parent_sig: &str, created_at: u64) -> String {
    format!("{}/{}", parent_sig, formatted_timestamp(created_at))
}

/// Depth is the deepest parent's depth + 1; the signature extends the
/// longest parent signature (ties broken lexicographically).
fn thread_entry(
    parents: &[Arc<Note>],
    created_at: u64,
    memo: &HashMap<EventId, (usize, String)>,
) -> (usize, String) {
    let resolved: Vec<&(usize, String)> = parents
        .iter()
        .filter_map(|parent| memo.get(&parent.id))
        .collect();
    match resolved.iter().map(|(depth, _)| depth).max() {
        None => (0, root_signature(created_at)),
        Some(max_depth) => {
            let parent_sig = resolved
                .iter()
                .max_by(|a, b| a.1.len().cmp(&b.1.len()).then_with(|| a.1.cmp(&b.1)))
                .map(|(_, sig)| sig.as_str())
                .unwrap_or_default();
            (max_depth + 1, child_signature(parent_sig, created_at))
        }
    }
}
