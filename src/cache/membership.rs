//! Membership index: the message ids accepted for each thread.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::domain::error::{validate_message_id, validate_thread_id};
use crate::infra::storage::DurableStore;

use super::keys::Table;
use super::snapshot::{load_table, persist_table, remove_table};

/// Multi-valued `thread_id -> {message_id}` index. Inserts are idempotent.
pub struct MembershipIndex {
    entries: BTreeMap<String, BTreeSet<String>>,
    store: Arc<dyn DurableStore>,
}

impl MembershipIndex {
    pub fn open(store: Arc<dyn DurableStore>) -> Self {
        let mut entries: BTreeMap<String, BTreeSet<String>> =
            load_table(store.as_ref(), Table::Memberships);
        entries.retain(|_, members| !members.is_empty());
        Self { entries, store }
    }

    /// Add `message_id` to the set for `thread_id`.
    ///
    /// Returns true only when the id was not already present.
    pub fn add(&mut self, thread_id: &str, message_id: &str) -> bool {
        if validate_thread_id(thread_id).is_err() || validate_message_id(message_id).is_err() {
            debug!(thread_id, message_id, "Ignoring membership with blank identifier");
            return false;
        }

        let inserted = self
            .entries
            .entry(thread_id.to_string())
            .or_default()
            .insert(message_id.to_string());
        if inserted {
            self.persist();
        }
        inserted
    }

    pub fn contains(&self, thread_id: &str, message_id: &str) -> bool {
        self.entries
            .get(thread_id)
            .is_some_and(|members| members.contains(message_id))
    }

    /// Every accepted id for `thread_id`; empty when the thread is unknown.
    pub fn all(&self, thread_id: &str) -> BTreeSet<String> {
        self.entries.get(thread_id).cloned().unwrap_or_default()
    }

    pub fn has_any(&self, thread_id: &str) -> bool {
        self.entries
            .get(thread_id)
            .is_some_and(|members| !members.is_empty())
    }

    /// Remove the whole set for `thread_id`. Clearing an absent entry is a no-op.
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
        remove_table(self.store.as_ref(), Table::Memberships);
    }

    fn persist(&self) {
        persist_table(self.store.as_ref(), Table::Memberships, &self.entries);
    }
}
