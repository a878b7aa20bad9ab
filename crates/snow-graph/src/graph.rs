//! Process-wide note registry: get-or-create identity resolution and
//! idempotent merging of incoming events into the relationship graph.
//!
//! The graph is created once at startup and passed around as an `Arc`
//! handle; it is the only writer of note relationship sets. Every merge
//! that actually mutated something invalidates the debounced change bus,
//! which feed aggregators subscribe to.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::{Context, Result};
use nostr_sdk::{Event, EventId, Kind, PublicKey};
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::config::GraphConfig;
use crate::note::Note;
use crate::observable::{Debounced, Subscription, WatchScope};
use crate::profile::Profile;

/// Registry sizes, published on the change bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    pub notes: usize,
    pub profiles: usize,
}

/// The process-wide note graph.
pub struct NoteGraph {
    cfg: GraphConfig,
    notes: RwLock<HashMap<EventId, Arc<Note>>>,
    profiles: RwLock<HashMap<PublicKey, Arc<Profile>>>,
    scope: Option<Arc<dyn WatchScope>>,
    live: Debounced<GraphStats>,
}

impl NoteGraph {
    pub fn new(cfg: GraphConfig) -> Arc<Self> {
        Self::build(cfg, None)
    }

    /// Graph whose note observables register watched ids with `scope`
    /// when they gain their first subscriber.
    pub fn with_scope(cfg: GraphConfig, scope: Arc<dyn WatchScope>) -> Arc<Self> {
        Self::build(cfg, Some(scope))
    }

    fn build(cfg: GraphConfig, scope: Option<Arc<dyn WatchScope>>) -> Arc<Self> {
        let delay = Duration::from_millis(cfg.note_debounce_ms);
        let capacity = cfg.channel_capacity;
        Arc::new_cyclic(|weak: &Weak<NoteGraph>| {
            let weak = weak.clone();
            let live = Debounced::new(delay, capacity, move || {
                weak.upgrade().map(|graph| graph.stats())
            });
            Self {
                cfg,
                notes: RwLock::new(HashMap::new()),
                profiles: RwLock::new(HashMap::new()),
                scope,
                live,
            }
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.cfg
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            notes: self.notes.read().len(),
            profiles: self.profiles.read().len(),
        }
    }

    /// The change bus: invalidated by every merge that mutated anything.
    pub fn live(&self) -> &Debounced<GraphStats> {
        &self.live
    }

    pub fn subscribe_changes(&self) -> Subscription<GraphStats> {
        self.live.subscribe()
    }

    /// The note for `id`, creating a placeholder if unseen. Never yields
    /// two distinct instances for one id, also under concurrent callers.
    pub fn get_or_create(&self, id: EventId) -> Arc<Note> {
        if let Some(note) = self.notes.read().get(&id) {
            return Arc::clone(note);
        }
        let mut notes = self.notes.write();
        Arc::clone(
            notes
                .entry(id)
                .or_insert_with(|| Note::new(id, &self.cfg, self.scope.clone())),
        )
    }

    pub fn get(&self, id: &EventId) -> Option<Arc<Note>> {
        self.notes.read().get(id).cloned()
    }

    pub fn get_or_create_profile(&self, pubkey: PublicKey) -> Arc<Profile> {
        if let Some(profile) = self.profiles.read().get(&pubkey) {
            return Arc::clone(profile);
        }
        let mut profiles = self.profiles.write();
        Arc::clone(
            profiles
                .entry(pubkey)
                .or_insert_with(|| Profile::new(pubkey)),
        )
    }

    pub fn profile(&self, pubkey: &PublicKey) -> Option<Arc<Profile>> {
        self.profiles.read().get(pubkey).cloned()
    }

    /// Merge one parsed, signature-valid event into the graph.
    ///
    /// Resolves or creates the target note and every referenced note and
    /// profile, applies the relationship merges for the event's kind,
    /// records the relay sighting, and raises the change bus iff anything
    /// mutated. Malformed references are skipped individually; duplicate
    /// and out-of-order deliveries are no-ops. Returns whether anything
    /// changed.
    pub fn merge(&self, event: &Event, relay: Option<&str>) -> bool {
        let mut mutated = match event.kind {
            Kind::TextNote => self.consume_text_note(event),
            Kind::ChannelMessage => self.consume_channel_message(event),
            Kind::Reaction => self.consume_reaction(event),
            Kind::Repost => self.consume_repost(event),
            Kind::Reporting => self.consume_report(event),
            Kind::ZapRequest => self.consume_zap_request(event),
            Kind::ZapReceipt => self.consume_zap_receipt(event),
            kind => {
                trace!(%kind, id = %event.id, "no relationship merge for event kind");
                false
            }
        };

        // The sighting is about delivery, not content, so it is recorded
        // for unhandled kinds too.
        if let Some(url) = relay {
            mutated |= self.get_or_create(event.id).add_relay(url);
        }

        if mutated {
            self.live.invalidate();
        }
        mutated
    }

    /// Materialize the event's own note with author, mentions and
    /// ancestor references resolved through get-or-create.
    fn materialize(&self, event: &Event) -> (Arc<Note>, bool) {
        let note = self.get_or_create(event.id);
        if note.is_materialized() {
            return (note, false);
        }
        let author = self.get_or_create_profile(event.pubkey);
        let mentions = self.referenced_profiles(event);
        let reply_to = self.referenced_notes(event);
        let fresh = note.materialize(event.clone(), author, mentions, reply_to);
        (note, fresh)
    }

    fn consume_text_note(&self, event: &Event) -> bool {
        let (note, fresh) = self.materialize(event);
        if !fresh {
            return false;
        }
        for parent in note.reply_to() {
            parent.add_reply(Arc::clone(&note));
        }
        true
    }

    /// Channel messages point at their channel with the first `e`
    /// reference; the rest is the ordinary ancestor chain.
    fn consume_channel_message(&self, event: &Event) -> bool {
        let note = self.get_or_create(event.id);
        if note.is_materialized() {
            return false;
        }
        let mut refs = self.referenced_notes(event);
        let channel = if refs.is_empty() {
            None
        } else {
            Some(refs.remove(0))
        };
        let author = self.get_or_create_profile(event.pubkey);
        let mentions = self.referenced_profiles(event);
        let reply_to = refs;
        if !note.materialize(event.clone(), author, mentions, reply_to.clone()) {
            return false;
        }
        if let Some(channel) = channel {
            note.set_channel(channel);
        }
        for parent in reply_to {
            parent.add_reply(Arc::clone(&note));
        }
        true
    }

    fn consume_reaction(&self, event: &Event) -> bool {
        let (note, fresh) = self.materialize(event);
        if !fresh {
            return false;
        }
        for target in note.reply_to() {
            target.add_reaction(Arc::clone(&note));
        }
        true
    }

    fn consume_repost(&self, event: &Event) -> bool {
        let (note, fresh) = self.materialize(event);
        if !fresh {
            return false;
        }
        for target in note.reply_to() {
            target.add_boost(Arc::clone(&note));
        }
        true
    }

    /// Reports land on every referenced note and on every referenced
    /// profile, keyed by the reporting author.
    fn consume_report(&self, event: &Event) -> bool {
        let (report, fresh) = self.materialize(event);
        if !fresh {
            return false;
        }
        for target in report.reply_to() {
            target.add_report(Arc::clone(&report));
        }
        for profile in report.mentions() {
            profile.add_report(Arc::clone(&report));
        }
        true
    }

    fn consume_zap_request(&self, event: &Event) -> bool {
        let (request, fresh) = self.materialize(event);
        if !fresh {
            return false;
        }
        for target in request.reply_to() {
            target.add_zap(Arc::clone(&request), None);
        }
        true
    }

    /// Receipts complete the two-phase zap: the embedded request becomes
    /// the key, the receipt the value. A receipt whose description cannot
    /// be parsed still materializes as a note of its own.
    fn consume_zap_receipt(&self, event: &Event) -> bool {
        let (receipt, fresh) = self.materialize(event);
        if !fresh {
            return false;
        }
        match embedded_zap_request(event) {
            Ok(request_event) => {
                let (request, _) = self.materialize(&request_event);
                for target in receipt.reply_to() {
                    target.add_zap(Arc::clone(&request), Some(Arc::clone(&receipt)));
                }
            }
            Err(err) => {
                warn!(id = %event.id, %err, "zap receipt without usable request");
            }
        }
        true
    }

    fn referenced_notes(&self, event: &Event) -> Vec<Arc<Note>> {
        tag_values(event, "e")
            .filter_map(|hex| match EventId::from_hex(hex) {
                Ok(id) => Some(self.get_or_create(id)),
                Err(err) => {
                    debug!(id = %event.id, %err, "skipping malformed e tag");
                    None
                }
            })
            .collect()
    }

    fn referenced_profiles(&self, event: &Event) -> Vec<Arc<Profile>> {
        tag_values(event, "p")
            .filter_map(|hex| match PublicKey::from_hex(hex) {
                Ok(pubkey) => Some(self.get_or_create_profile(pubkey)),
                Err(err) => {
                    debug!(id = %event.id, %err, "skipping malformed p tag");
                    None
                }
            })
            .collect()
    }
}

/// Zap receipts (NIP-57) embed the original zap request as JSON in their
/// `description` tag.
pub(crate) fn embedded_zap_request(receipt: &Event) -> Result<Event> {
    let description = tag_values(receipt, "description")
        .next()
        .context("zap receipt has no description tag")?;
    serde_json::from_str(description).context("zap receipt description is not a valid event")
}

fn tag_values<'a>(event: &'a Event, name: &'a str) -> impl Iterator<Item = &'a String> {
    event.tags.iter().filter_map(move |tag| {
        let slice = tag.as_slice();
        if slice.first().map(|v| v.as_str()) == Some(name) {
            slice.get(1)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr_sdk::{EventBuilder, JsonUtil, Keys, Tag, TagKind, Timestamp};

    fn graph() -> Arc<NoteGraph> {
        NoteGraph::new(GraphConfig::default())
    }

    fn e_tag(id: EventId) -> Tag {
        Tag::custom(TagKind::custom("e"), vec![id.to_hex()])
    }

    fn p_tag(pubkey: PublicKey) -> Tag {
        Tag::custom(TagKind::custom("p"), vec![pubkey.to_hex()])
    }

    fn build(keys: &Keys, kind: Kind, content: &str, created_at: u64, tags: Vec<Tag>) -> Event {
        EventBuilder::new(kind, content)
            .tags(tags)
            .custom_created_at(Timestamp::from_secs(created_at))
            .sign_with_keys(keys)
            .unwrap()
    }

    #[test]
    fn test_placeholder_and_materialized_are_same_instance() {
        let graph = graph();
        let keys = Keys::generate();
        let root = build(&keys, Kind::TextNote, "root", 1_700_000_000, vec![]);

        let before = graph.get_or_create(root.id);
        assert!(!before.is_materialized());

        assert!(graph.merge(&root, None));
        let after = graph.get_or_create(root.id);
        assert!(Arc::ptr_eq(&before, &after));
        assert!(after.is_materialized());
    }

    #[test]
    fn test_root_and_reply_scenario() {
        let graph = graph();
        let keys = Keys::generate();
        let root = build(&keys, Kind::TextNote, "root", 1_700_000_000, vec![]);
        let reply = build(
            &keys,
            Kind::TextNote,
            "reply",
            1_700_000_100,
            vec![e_tag(root.id)],
        );

        graph.merge(&root, None);
        graph.merge(&reply, None);

        let root_note = graph.get(&root.id).unwrap();
        let reply_note = graph.get(&reply.id).unwrap();
        assert_eq!(root_note.replies(), vec![reply_note.clone()]);
        assert_eq!(root_note.reply_level(), 0);
        assert_eq!(reply_note.reply_level(), 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let graph = graph();
        let keys = Keys::generate();
        let root = build(&keys, Kind::TextNote, "root", 1_700_000_000, vec![]);
        let reply = build(
            &keys,
            Kind::TextNote,
            "reply",
            1_700_000_100,
            vec![e_tag(root.id)],
        );

        graph.merge(&root, None);
        assert!(graph.merge(&reply, None));
        assert!(!graph.merge(&reply, None));

        let root_note = graph.get(&root.id).unwrap();
        assert_eq!(root_note.reply_count(), 1);
    }

    #[test]
    fn test_merges_commute() {
        let keys = Keys::generate();
        let other = Keys::generate();
        let root = build(&keys, Kind::TextNote, "root", 1_700_000_000, vec![]);
        let reply = build(
            &keys,
            Kind::TextNote,
            "reply",
            1_700_000_100,
            vec![e_tag(root.id)],
        );
        let reaction = build(&other, Kind::Reaction, "+", 1_700_000_200, vec![e_tag(root.id)]);

        let forward = graph();
        forward.merge(&root, None);
        forward.merge(&reply, None);
        forward.merge(&reaction, None);

        let reverse = graph();
        reverse.merge(&reaction, None);
        reverse.merge(&reply, None);
        reverse.merge(&root, None);

        for g in [&forward, &reverse] {
            let note = g.get(&root.id).unwrap();
            assert_eq!(note.reply_count(), 1);
            assert_eq!(note.reaction_count(), 1);
            assert!(note.is_materialized());
        }
    }

    #[test]
    fn test_reaction_dedup_and_membership() {
        let graph = graph();
        let author = Keys::generate();
        let reactor = Keys::generate();
        let note = build(&author, Kind::TextNote, "nice post", 1_700_000_000, vec![]);
        let reaction = build(
            &reactor,
            Kind::Reaction,
            "+",
            1_700_000_100,
            vec![e_tag(note.id)],
        );

        graph.merge(&note, None);
        graph.merge(&reaction, None);
        graph.merge(&reaction, None);

        let target = graph.get(&note.id).unwrap();
        assert_eq!(target.reaction_count(), 1);
        assert!(target.has_reacted(&reactor.public_key(), "+"));
        assert!(!target.has_reacted(&reactor.public_key(), "-"));
        assert!(target.is_reacted_by(&reactor.public_key()));
        assert!(!target.is_reacted_by(&author.public_key()));
    }

    #[test]
    fn test_reply_before_parent_resolves_forward_reference() {
        let graph = graph();
        let keys = Keys::generate();
        let root = build(&keys, Kind::TextNote, "root", 1_700_000_000, vec![]);
        let reply = build(
            &keys,
            Kind::TextNote,
            "reply",
            1_700_000_100,
            vec![e_tag(root.id)],
        );

        // Child first: the parent exists only as a placeholder.
        graph.merge(&reply, None);
        let root_note = graph.get(&root.id).unwrap();
        assert!(!root_note.is_materialized());
        assert_eq!(root_note.reply_count(), 1);

        graph.merge(&root, None);
        assert!(root_note.is_materialized());
        assert_eq!(root_note.reply_count(), 1);
    }

    #[test]
    fn test_report_accumulation_per_author() {
        let graph = graph();
        let author = Keys::generate();
        let reporter = Keys::generate();
        let note = build(&author, Kind::TextNote, "sketchy", 1_700_000_000, vec![]);
        let first = build(
            &reporter,
            Kind::Reporting,
            "spam",
            1_700_000_100,
            vec![e_tag(note.id), p_tag(author.public_key())],
        );
        let second = build(
            &reporter,
            Kind::Reporting,
            "impersonation",
            1_700_000_200,
            vec![e_tag(note.id), p_tag(author.public_key())],
        );

        graph.merge(&note, None);
        graph.merge(&first, None);
        graph.merge(&second, None);
        graph.merge(&first, None);

        let target = graph.get(&note.id).unwrap();
        assert_eq!(target.reports_by(&reporter.public_key()).len(), 2);

        // The reported author's profile accumulates them too.
        let profile = graph.profile(&author.public_key()).unwrap();
        assert_eq!(profile.reports_by(&reporter.public_key()).len(), 2);
        assert!(target.has_any_reports());
    }

    #[test]
    fn test_author_reports_keep_note_flagged_for_a_day() {
        let graph = graph();
        let author = Keys::generate();
        let reporter = Keys::generate();
        let now = Timestamp::now().as_secs();

        let clean = build(&author, Kind::TextNote, "clean", now, vec![]);
        graph.merge(&clean, None);
        assert!(!graph.get(&clean.id).unwrap().has_any_reports());

        // A fresh report against the author flags their other notes.
        let report = build(
            &reporter,
            Kind::Reporting,
            "spam",
            now,
            vec![p_tag(author.public_key())],
        );
        graph.merge(&report, None);
        assert!(graph.get(&clean.id).unwrap().has_any_reports());

        // A stale report alone does not.
        let graph2 = self::graph();
        let clean2 = build(&author, Kind::TextNote, "clean", now, vec![]);
        let old_report = build(
            &reporter,
            Kind::Reporting,
            "spam",
            now - 2 * 24 * 60 * 60,
            vec![p_tag(author.public_key())],
        );
        graph2.merge(&clean2, None);
        graph2.merge(&old_report, None);
        assert!(!graph2.get(&clean2.id).unwrap().has_any_reports());
    }

    #[test]
    fn test_zap_two_phase_merge() {
        let graph = graph();
        let author = Keys::generate();
        let zapper = Keys::generate();
        let note = build(&author, Kind::TextNote, "zap me", 1_700_000_000, vec![]);
        let request = build(
            &zapper,
            Kind::ZapRequest,
            "",
            1_700_000_100,
            vec![
                e_tag(note.id),
                Tag::custom(TagKind::custom("amount"), vec!["21000".to_string()]),
            ],
        );
        let receipt = build(
            &zapper,
            Kind::ZapReceipt,
            "",
            1_700_000_200,
            vec![
                e_tag(note.id),
                Tag::custom(TagKind::custom("description"), vec![request.as_json()]),
            ],
        );

        graph.merge(&note, None);
        graph.merge(&request, None);

        let target = graph.get(&note.id).unwrap();
        let request_note = graph.get(&request.id).unwrap();
        assert_eq!(target.zaps().get(&request_note), Some(&None));
        assert!(target.is_zapped_by(&zapper.public_key()));
        assert_eq!(target.zapped_amount_msats(), 0);

        graph.merge(&receipt, None);
        let receipt_note = graph.get(&receipt.id).unwrap();
        assert_eq!(
            target.zaps().get(&request_note),
            Some(&Some(receipt_note.clone()))
        );
        // Receipt has no amount tag of its own; the embedded request's
        // amount is used.
        assert_eq!(target.zapped_amount_msats(), 21_000);

        // Re-delivering the request does not clear the receipt.
        graph.merge(&request, None);
        assert_eq!(target.zaps().get(&request_note), Some(&Some(receipt_note)));
    }

    #[test]
    fn test_receipt_before_request_still_pairs() {
        let graph = graph();
        let author = Keys::generate();
        let zapper = Keys::generate();
        let note = build(&author, Kind::TextNote, "zap me", 1_700_000_000, vec![]);
        let request = build(
            &zapper,
            Kind::ZapRequest,
            "",
            1_700_000_100,
            vec![e_tag(note.id)],
        );
        let receipt = build(
            &zapper,
            Kind::ZapReceipt,
            "",
            1_700_000_200,
            vec![
                e_tag(note.id),
                Tag::custom(TagKind::custom("description"), vec![request.as_json()]),
            ],
        );

        graph.merge(&note, None);
        graph.merge(&receipt, None);
        graph.merge(&request, None);

        let target = graph.get(&note.id).unwrap();
        let request_note = graph.get(&request.id).unwrap();
        let receipt_note = graph.get(&receipt.id).unwrap();
        assert_eq!(target.zaps().get(&request_note), Some(&Some(receipt_note)));
    }

    #[test]
    fn test_malformed_zap_description_records_receipt_only() {
        let graph = graph();
        let author = Keys::generate();
        let zapper = Keys::generate();
        let note = build(&author, Kind::TextNote, "zap me", 1_700_000_000, vec![]);
        let receipt = build(
            &zapper,
            Kind::ZapReceipt,
            "",
            1_700_000_200,
            vec![
                e_tag(note.id),
                Tag::custom(TagKind::custom("description"), vec!["not json".to_string()]),
            ],
        );

        graph.merge(&note, None);
        assert!(graph.merge(&receipt, None));

        let target = graph.get(&note.id).unwrap();
        assert!(target.zaps().is_empty());
        assert!(graph.get(&receipt.id).unwrap().is_materialized());
    }

    #[test]
    fn test_relay_sightings_dedup() {
        let graph = graph();
        let keys = Keys::generate();
        let note = build(&keys, Kind::TextNote, "hello", 1_700_000_000, vec![]);

        assert!(graph.merge(&note, Some("wss://relay.damus.io")));
        assert!(!graph.merge(&note, Some("wss://relay.damus.io")));
        assert!(graph.merge(&note, Some("wss://nos.lol")));

        let mut relays = graph.get(&note.id).unwrap().relays();
        relays.sort();
        assert_eq!(relays, vec!["wss://nos.lol", "wss://relay.damus.io"]);
    }

    #[test]
    fn test_unknown_kind_records_sighting_only() {
        let graph = graph();
        let keys = Keys::generate();
        let event = build(&keys, Kind::Custom(30078), "{}", 1_700_000_000, vec![]);

        assert!(graph.merge(&event, Some("wss://relay.damus.io")));
        let note = graph.get(&event.id).unwrap();
        assert!(!note.is_materialized());
        assert_eq!(note.relays(), vec!["wss://relay.damus.io"]);

        assert!(!graph.merge(&event, None));
    }

    #[test]
    fn test_malformed_references_are_skipped_individually() {
        let graph = graph();
        let keys = Keys::generate();
        let root = build(&keys, Kind::TextNote, "root", 1_700_000_000, vec![]);
        let reply = build(
            &keys,
            Kind::TextNote,
            "reply",
            1_700_000_100,
            vec![
                Tag::custom(TagKind::custom("e"), vec!["zzzz-not-hex".to_string()]),
                e_tag(root.id),
                Tag::custom(TagKind::custom("p"), vec!["also bad".to_string()]),
            ],
        );

        graph.merge(&root, None);
        assert!(graph.merge(&reply, None));

        // The bad references are dropped, the good one still lands.
        assert_eq!(graph.get(&root.id).unwrap().reply_count(), 1);
        assert_eq!(graph.get(&reply.id).unwrap().reply_to().len(), 1);
    }

    #[test]
    fn test_cited_profiles_resolve_through_graph() {
        let graph = graph();
        let keys = Keys::generate();
        let friend = Keys::generate();
        let note = build(
            &keys,
            Kind::TextNote,
            "shoutout to #[0] and broken #[7]",
            1_700_000_000,
            vec![p_tag(friend.public_key())],
        );

        graph.merge(&note, None);
        let cited = graph.get(&note.id).unwrap().cited_profiles(&graph);
        assert_eq!(cited.len(), 1);
        assert!(cited
            .iter()
            .any(|profile| profile.pubkey() == friend.public_key()));
    }

    #[test]
    fn test_directly_cites_follows_repost_target() {
        let graph = graph();
        let author = Keys::generate();
        let booster = Keys::generate();
        let note = build(&author, Kind::TextNote, "original", 1_700_000_000, vec![]);
        let repost = build(
            &booster,
            Kind::Repost,
            "",
            1_700_000_100,
            vec![e_tag(note.id)],
        );

        graph.merge(&note, None);
        graph.merge(&repost, None);

        let author_profile = graph.get_or_create_profile(author.public_key());
        let repost_note = graph.get(&repost.id).unwrap();
        assert!(repost_note.directly_cites(&graph, &author_profile));

        let stranger = graph.get_or_create_profile(Keys::generate().public_key());
        assert!(!repost_note.directly_cites(&graph, &stranger));
    }

    #[test]
    fn test_channel_message_links_channel() {
        let graph = graph();
        let keys = Keys::generate();
        let channel = build(&keys, Kind::ChannelCreation, "{}", 1_700_000_000, vec![]);
        let message = build(
            &keys,
            Kind::ChannelMessage,
            "hi all",
            1_700_000_100,
            vec![e_tag(channel.id)],
        );

        assert!(graph.merge(&message, None));
        let note = graph.get(&message.id).unwrap();
        assert_eq!(note.channel().unwrap().id(), channel.id);
        // The channel reference is a link, not an ancestor.
        assert_eq!(note.reply_level(), 0);
    }

    #[test]
    fn test_stats_track_registries() {
        let graph = graph();
        let keys = Keys::generate();
        let note = build(&keys, Kind::TextNote, "hello", 1_700_000_000, vec![]);

        assert_eq!(graph.stats(), GraphStats { notes: 0, profiles: 0 });
        graph.merge(&note, None);
        assert_eq!(graph.stats(), GraphStats { notes: 1, profiles: 1 });
    }
}
