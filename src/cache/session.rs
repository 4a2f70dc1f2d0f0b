//! Session facade over the annotation tables.
//!
//! Holds the primary cache and both indices behind one lock so that an
//! eviction or deletion and its index cascade happen atomically. Callers of
//! this type never observe an index entry whose record is gone.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, instrument};

use crate::domain::annotation::{AnnotationPatch, AnnotationRecord};
use crate::domain::error::validate_message_id;
use crate::domain::sections::classify;
use crate::infra::storage::DurableStore;

use super::clock::{Clock, SystemClock};
use super::config::CacheConfig;
use super::lock::mutex_lock;
use super::markers::MarkerIndex;
use super::membership::MembershipIndex;
use super::store::AnnotationCache;

const SOURCE: &str = "cache::session";

/// Result of recording an accepted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// No annotation exists for the thread (or an identifier was blank).
    UnknownThread,
    /// First accepted message for the thread.
    FirstAcceptance,
    /// Newly accepted; the thread already had acceptances.
    Added,
    /// The message was already accepted.
    AlreadyAccepted,
}

impl AcceptOutcome {
    pub fn is_new(self) -> bool {
        matches!(self, Self::FirstAcceptance | Self::Added)
    }
}

struct Tables {
    cache: AnnotationCache,
    markers: MarkerIndex,
    memberships: MembershipIndex,
}

impl Tables {
    fn cascade(&mut self, thread_ids: &[String]) {
        for thread_id in thread_ids {
            self.markers.clear(thread_id);
            self.memberships.clear(thread_id);
        }
    }

    /// Drop index entries whose record no longer exists.
    fn reconcile(&mut self) -> usize {
        let cache = &self.cache;
        let markers = self.markers.retain_threads(|t| cache.exists(t));
        let memberships = self.memberships.retain_threads(|t| cache.exists(t));
        let dropped = markers.len() + memberships.len();
        if dropped > 0 {
            info!(
                markers = ?markers,
                memberships = ?memberships,
                "Dropped index entries without an annotation record"
            );
        }
        dropped
    }
}

/// Per-session owner of the annotation cache and its indices.
pub struct AnnotationSession {
    tables: Mutex<Tables>,
}

impl AnnotationSession {
    pub fn open(store: Arc<dyn DurableStore>, config: &CacheConfig) -> Self {
        Self::open_with_clock(store, config, Arc::new(SystemClock))
    }

    /// Open all three tables from `store` and repair any dangling index entries.
    pub fn open_with_clock(
        store: Arc<dyn DurableStore>,
        config: &CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut tables = Tables {
            cache: AnnotationCache::open_with_clock(Arc::clone(&store), config, clock),
            markers: MarkerIndex::open(Arc::clone(&store)),
            memberships: MembershipIndex::open(store),
        };
        tables.reconcile();

        Self {
            tables: Mutex::new(tables),
        }
    }

    /// Merge `patch` into the thread's annotation, cascading any evictions.
    #[instrument(level = "debug", skip(self, patch))]
    pub fn upsert(&self, thread_id: &str, patch: &AnnotationPatch) -> Vec<String> {
        let mut tables = self.lock("upsert");
        let evicted = tables.cache.upsert(thread_id, patch);
        tables.cascade(&evicted);
        evicted
    }

    /// Classify `raw_text`, store it as the thread's annotation and mark
    /// `message_id` as its source. Returns evicted thread ids.
    #[instrument(level = "debug", skip(self, raw_text))]
    pub fn record_classified(
        &self,
        thread_id: &str,
        message_id: &str,
        raw_text: &str,
    ) -> Vec<String> {
        if validate_message_id(message_id).is_err() {
            debug!("Ignoring classified annotation without a message id");
            return Vec::new();
        }

        let patch = AnnotationPatch::from(classify(raw_text));
        let mut tables = self.lock("record_classified");
        let evicted = tables.cache.upsert(thread_id, &patch);
        tables.cascade(&evicted);
        if tables.cache.exists(thread_id) {
            tables.markers.set(thread_id, message_id);
        }
        evicted
    }

    pub fn get(&self, thread_id: &str) -> Option<AnnotationRecord> {
        self.lock("get").cache.get(thread_id).cloned()
    }

    pub fn exists(&self, thread_id: &str) -> bool {
        self.lock("exists").cache.exists(thread_id)
    }

    pub fn count(&self) -> usize {
        self.lock("count").cache.count()
    }

    /// Delete the thread's annotation together with its marker and memberships.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&self, thread_id: &str) -> bool {
        let mut tables = self.lock("delete");
        let existed = tables.cache.delete(thread_id);
        if existed {
            tables.cascade(&[thread_id.to_string()]);
        }
        existed
    }

    /// Evict the oldest annotation and its index entries.
    #[instrument(level = "debug", skip(self))]
    pub fn evict_oldest(&self) -> Option<String> {
        let mut tables = self.lock("evict_oldest");
        let victim = tables.cache.evict_oldest()?;
        tables.cascade(std::slice::from_ref(&victim));
        Some(victim)
    }

    /// Point the thread's marker at `message_id`. Refused for unknown threads.
    pub fn set_marker(&self, thread_id: &str, message_id: &str) -> bool {
        let mut tables = self.lock("set_marker");
        if !tables.cache.exists(thread_id) {
            debug!(thread_id, "Refusing marker for thread without annotation");
            return false;
        }
        tables.markers.set(thread_id, message_id)
    }

    pub fn marker(&self, thread_id: &str) -> Option<String> {
        self.lock("marker").markers.get(thread_id).map(str::to_string)
    }

    pub fn is_current_marker(&self, thread_id: &str, message_id: &str) -> bool {
        self.lock("is_current_marker")
            .markers
            .is_current(thread_id, message_id)
    }

    /// Record `message_id` as accepted for the thread.
    pub fn accept(&self, thread_id: &str, message_id: &str) -> AcceptOutcome {
        let mut tables = self.lock("accept");
        if !tables.cache.exists(thread_id) {
            debug!(thread_id, "Refusing acceptance for thread without annotation");
            return AcceptOutcome::UnknownThread;
        }

        let first = !tables.memberships.has_any(thread_id);
        if !tables.memberships.add(thread_id, message_id) {
            return if tables.memberships.contains(thread_id, message_id) {
                AcceptOutcome::AlreadyAccepted
            } else {
                AcceptOutcome::UnknownThread
            };
        }

        if first {
            info!(thread_id, message_id, "First accepted message for thread");
            AcceptOutcome::FirstAcceptance
        } else {
            AcceptOutcome::Added
        }
    }

    pub fn is_accepted(&self, thread_id: &str, message_id: &str) -> bool {
        self.lock("is_accepted")
            .memberships
            .contains(thread_id, message_id)
    }

    pub fn accepted(&self, thread_id: &str) -> BTreeSet<String> {
        self.lock("accepted").memberships.all(thread_id)
    }

    pub fn has_acceptances(&self, thread_id: &str) -> bool {
        self.lock("has_acceptances").memberships.has_any(thread_id)
    }

    /// Tear down the session: clear every table and its stored snapshot.
    #[instrument(level = "debug", skip(self))]
    pub fn purge(&self) {
        let mut tables = self.lock("purge");
        tables.cache.purge();
        tables.markers.purge();
        tables.memberships.purge();
        info!("Purged annotation session");
    }

    fn lock(&self, op: &'static str) -> MutexGuard<'_, Tables> {
        mutex_lock(&self.tables, SOURCE, op)
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;
    use time::macros::datetime;

    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::keys::Table;
    use crate::infra::storage::MemoryStore;

    fn session(capacity: usize) -> (AnnotationSession, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(datetime!(2026-05-01 08:00 UTC)));
        let session = AnnotationSession::open_with_clock(
            store.clone(),
            &CacheConfig::with_capacity(capacity),
            clock.clone(),
        );
        (session, store, clock)
    }

    fn patch(components: &str) -> AnnotationPatch {
        AnnotationPatch::default().with_components(components)
    }

    #[test]
    fn eviction_cascades_into_both_indices() {
        let (session, _, clock) = session(2);
        session.upsert("t-1", &patch("a"));
        session.set_marker("t-1", "m-1");
        session.accept("t-1", "m-1");

        clock.advance(Duration::seconds(1));
        session.upsert("t-2", &patch("b"));
        clock.advance(Duration::seconds(1));
        let evicted = session.upsert("t-3", &patch("c"));

        assert_eq!(evicted, vec!["t-1".to_string()]);
        assert!(session.marker("t-1").is_none());
        assert!(session.accepted("t-1").is_empty());
        assert!(!session.has_acceptances("t-1"));
    }

    #[test]
    fn delete_cascades_and_reports_existence() {
        let (session, _, _) = session(4);
        session.upsert("t-1", &patch("a"));
        session.set_marker("t-1", "m-1");
        session.accept("t-1", "m-9");

        assert!(session.delete("t-1"));
        assert!(!session.exists("t-1"));
        assert!(session.marker("t-1").is_none());
        assert!(!session.is_accepted("t-1", "m-9"));
        assert!(!session.delete("t-1"));
    }

    #[test]
    fn index_writes_require_an_annotation() {
        let (session, _, _) = session(4);
        assert!(!session.set_marker("ghost", "m-1"));
        assert_eq!(session.accept("ghost", "m-1"), AcceptOutcome::UnknownThread);
        assert!(session.marker("ghost").is_none());
    }

    #[test]
    fn accept_reports_first_acceptance_once() {
        let (session, _, _) = session(4);
        session.upsert("t-1", &patch("a"));

        assert_eq!(session.accept("t-1", "m-1"), AcceptOutcome::FirstAcceptance);
        assert_eq!(session.accept("t-1", "m-1"), AcceptOutcome::AlreadyAccepted);
        assert_eq!(session.accept("t-1", "m-2"), AcceptOutcome::Added);
        assert_eq!(session.accept("t-1", ""), AcceptOutcome::UnknownThread);
        assert_eq!(session.accepted("t-1").len(), 2);
        assert!(AcceptOutcome::FirstAcceptance.is_new());
        assert!(!AcceptOutcome::AlreadyAccepted.is_new());
    }

    #[test]
    fn record_classified_stores_sections_and_marker() {
        let (session, _, _) = session(4);
        let evicted = session.record_classified(
            "t-1",
            "m-7",
            "Komponentų sąrašas:\nPump A\nKaina: 100\nKaina: 200",
        );
        assert!(evicted.is_empty());

        let record = session.get("t-1").expect("record");
        assert_eq!(record.components, "Pump A");
        assert_eq!(record.tech_description, "");
        assert_eq!(record.pricing, "Kaina: 100\nKaina: 200");
        assert!(session.is_current_marker("t-1", "m-7"));

        assert!(session.record_classified("t-2", "", "text").is_empty());
        assert!(!session.exists("t-2"));
    }

    #[test]
    fn evict_oldest_cascades() {
        let (session, _, clock) = session(4);
        session.upsert("old", &patch("a"));
        session.set_marker("old", "m-1");
        clock.advance(Duration::seconds(1));
        session.upsert("new", &patch("b"));

        assert_eq!(session.evict_oldest().as_deref(), Some("old"));
        assert!(session.marker("old").is_none());
        assert_eq!(session.count(), 1);
    }

    #[test]
    fn open_drops_orphaned_index_entries() {
        let store = Arc::new(MemoryStore::new());
        store
            .write(Table::Markers.storage_key(), r#"{"gone":"m-1"}"#)
            .expect("write");
        store
            .write(Table::Memberships.storage_key(), r#"{"gone":["m-1"]}"#)
            .expect("write");

        let session = AnnotationSession::open(store.clone(), &CacheConfig::default());
        assert!(session.marker("gone").is_none());
        assert!(!session.has_acceptances("gone"));
        assert_eq!(
            store
                .read(Table::Markers.storage_key())
                .expect("read")
                .as_deref(),
            Some("{}")
        );
    }

    #[test]
    fn purge_clears_tables_and_storage() {
        let (session, store, _) = session(4);
        session.upsert("t-1", &patch("a"));
        session.set_marker("t-1", "m-1");
        session.accept("t-1", "m-1");
        assert_eq!(store.len(), 3);

        session.purge();
        assert_eq!(session.count(), 0);
        assert!(session.marker("t-1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn session_is_shareable_across_threads() {
        let (session, _, _) = session(3);
        let session = Arc::new(session);

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let thread_id = format!("w{worker}-t{i}");
                        session.upsert(&thread_id, &AnnotationPatch::default());
                        session.set_marker(&thread_id, "m");
                        session.accept(&thread_id, "m");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker finished");
        }

        assert_eq!(session.count(), 3);
        let tables = session.lock("test");
        for thread_id in tables.markers.thread_ids() {
            assert!(tables.cache.exists(thread_id));
        }
        for thread_id in tables.memberships.thread_ids() {
            assert!(tables.cache.exists(thread_id));
        }
    }
}
