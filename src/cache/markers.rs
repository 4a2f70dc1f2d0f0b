//! Marker index: the message that last produced each thread's annotation.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::error::{validate_message_id, validate_thread_id};
use crate::infra::storage::DurableStore;

use super::keys::Table;
use super::snapshot::{load_table, persist_table, remove_table};

/// Single-valued `thread_id -> message_id` index, last write wins.
pub struct MarkerIndex {
    entries: BTreeMap<String, String>,
    store: Arc<dyn DurableStore>,
}

impl MarkerIndex {
    pub fn open(store: Arc<dyn DurableStore>) -> Self {
        let entries = load_table(store.as_ref(), Table::Markers);
        Self { entries, store }
    }

    /// Record `message_id` as the current marker for `thread_id`.
    ///
    /// Returns false, without changing anything, for blank identifiers.
    pub fn set(&mut self, thread_id: &str, message_id: &str) -> bool {
        if validate_thread_id(thread_id).is_err() || validate_message_id(message_id).is_err() {
            debug!(thread_id, message_id, "Ignoring marker with blank identifier");
            return false;
        }

        let previous = self
            .entries
            .insert(thread_id.to_string(), message_id.to_string());
        if previous.as_deref() != Some(message_id) {
            self.persist();
        }
        true
    }

    pub fn get(&self, thread_id: &str) -> Option<&str> {
        self.entries.get(thread_id).map(String::as_str)
    }

    pub fn is_current(&self, thread_id: &str, message_id: &str) -> bool {
        self.get(thread_id) == Some(message_id)
    }

    /// Remove the marker for `thread_id`. Clearing an absent entry is a no-op.
    pub fn clear(&mut self, thread_id: &str) -> bool {
        if self.entries.remove(thread_id).is_none() {
            return false;
        }
        self.persist();
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn thread_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Keep only threads accepted by `keep`; returns the dropped thread ids.
    pub fn retain_threads(&mut self, mut keep: impl FnMut(&str) -> bool) -> Vec<String> {
        let dropped: Vec<String> = self
            .entries
            .keys()
            .filter(|thread_id| !keep(thread_id))
            .cloned()
            .collect();
        if dropped.is_empty() {
            return dropped;
        }
        for thread_id in &dropped {
            self.entries.remove(thread_id);
        }
        self.persist();
        dropped
    }

    pub fn purge(&mut self) {
        self.entries.clear();
        remove_table(self.store.as_ref(), Table::Markers);
    }

    fn persist(&self) {
        persist_table(self.store.as_ref(), Table::Markers, &self.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::MemoryStore;

    fn index() -> (MarkerIndex, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (MarkerIndex::open(store.clone()), store)
    }

    #[test]
    fn last_write_wins() {
        let (mut markers, _) = index();
        assert!(markers.set("t-1", "m-1"));
        assert!(markers.set("t-1", "m-2"));

        assert_eq!(markers.get("t-1"), Some("m-2"));
        assert!(markers.is_current("t-1", "m-2"));
        assert!(!markers.is_current("t-1", "m-1"));
        assert!(!markers.is_current("t-2", "m-2"));
    }

    #[test]
    fn clear_is_idempotent() {
        let (mut markers, _) = index();
        markers.set("t-1", "m-1");

        assert!(markers.clear("t-1"));
        assert!(!markers.clear("t-1"));
        assert!(markers.get("t-1").is_none());
        assert!(markers.is_empty());
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        let (mut markers, store) = index();
        assert!(!markers.set("", "m-1"));
        assert!(!markers.set("t-1", " "));
        assert!(markers.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn markers_survive_reopen() {
        let (mut markers, store) = index();
        markers.set("t-1", "m-1");
        markers.set("t-2", "m-2");
        markers.clear("t-2");

        let reopened = MarkerIndex::open(store);
        assert_eq!(reopened.get("t-1"), Some("m-1"));
        assert!(reopened.get("t-2").is_none());
    }

    #[test]
    fn retain_threads_reports_dropped_entries() {
        let (mut markers, store) = index();
        markers.set("keep", "m-1");
        markers.set("drop", "m-2");

        assert_eq!(markers.retain_threads(|t| t == "keep"), vec!["drop"]);
        assert!(markers.retain_threads(|_| true).is_empty());
        assert_eq!(markers.thread_ids().collect::<Vec<_>>(), vec!["keep"]);

        let reopened = MarkerIndex::open(store);
        assert_eq!(reopened.len(), 1);
    }
}
