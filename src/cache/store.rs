//! Capacity-bounded primary annotation table.
//!
//! Records are evicted first-in first-out by `created_at`, ties broken by the
//! insertion sequence. Evicted and deleted thread ids are reported to the
//! caller, which owns the cascade into the marker and membership indices.

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::Arc;

use metrics::{counter, gauge};
use tracing::{debug, info};

use crate::domain::annotation::{AnnotationPatch, AnnotationRecord};
use crate::domain::error::validate_thread_id;
use crate::infra::storage::DurableStore;

use super::clock::{Clock, SystemClock};
use super::config::CacheConfig;
use super::keys::Table;
use super::metrics::{METRIC_EVICT_TOTAL, METRIC_HIT_TOTAL, METRIC_MISS_TOTAL, METRIC_RECORDS};
use super::snapshot::{load_table, persist_table, remove_table};

/// Primary table of annotation records with FIFO eviction.
pub struct AnnotationCache {
    records: HashMap<String, AnnotationRecord>,
    capacity: NonZeroUsize,
    next_seq: u64,
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
}

impl AnnotationCache {
    /// Open the cache, loading any stored snapshot.
    pub fn open(store: Arc<dyn DurableStore>, config: &CacheConfig) -> Self {
        Self::open_with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        store: Arc<dyn DurableStore>,
        config: &CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let loaded: BTreeMap<String, AnnotationRecord> = load_table(store.as_ref(), Table::Records);
        let records: HashMap<String, AnnotationRecord> = loaded
            .into_iter()
            .filter(|(thread_id, _)| validate_thread_id(thread_id).is_ok())
            .map(|(thread_id, mut record)| {
                record.thread_id.clone_from(&thread_id);
                if record.updated_at < record.created_at {
                    record.updated_at = record.created_at;
                }
                (thread_id, record)
            })
            .collect();
        let next_seq = records
            .values()
            .map(|record| record.seq)
            .max()
            .map_or(0, |seq| seq + 1);

        debug!(
            records = records.len(),
            capacity = config.capacity_non_zero().get(),
            "Opened annotation cache"
        );
        gauge!(METRIC_RECORDS).set(records.len() as f64);

        Self {
            records,
            capacity: config.capacity_non_zero(),
            next_seq,
            store,
            clock,
        }
    }

    /// Insert or merge `patch` into the record for `thread_id`.
    ///
    /// Returns the thread ids evicted to stay within capacity. Only a new
    /// record can trigger eviction; updates never do. A blank `thread_id` is
    /// ignored.
    pub fn upsert(&mut self, thread_id: &str, patch: &AnnotationPatch) -> Vec<String> {
        if let Err(err) = validate_thread_id(thread_id) {
            debug!(error = %err, "Ignoring annotation upsert");
            return Vec::new();
        }

        let now = self.clock.now();

        if let Some(record) = self.records.get_mut(thread_id) {
            patch.apply_to(record);
            record.updated_at = now.max(record.created_at);
            debug!(thread_id, "Updated annotation");
            self.persist();
            return Vec::new();
        }

        let mut record = AnnotationRecord::new(thread_id, now, self.next_seq);
        self.next_seq += 1;
        patch.apply_to(&mut record);
        self.records.insert(thread_id.to_string(), record);
        debug!(thread_id, records = self.records.len(), "Inserted annotation");

        let evicted = self.evict_over_capacity();
        self.persist();
        evicted
    }

    pub fn get(&self, thread_id: &str) -> Option<&AnnotationRecord> {
        let record = self.records.get(thread_id);
        if record.is_some() {
            counter!(METRIC_HIT_TOTAL).increment(1);
        } else {
            counter!(METRIC_MISS_TOTAL).increment(1);
        }
        record
    }

    pub fn exists(&self, thread_id: &str) -> bool {
        self.records.contains_key(thread_id)
    }

    /// Remove the record for `thread_id`, returning whether it existed.
    ///
    /// Not counted as an eviction. The caller still owns the index cascade.
    pub fn delete(&mut self, thread_id: &str) -> bool {
        if self.records.remove(thread_id).is_none() {
            return false;
        }
        debug!(thread_id, "Deleted annotation");
        self.persist();
        true
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Thread ids in eviction order, oldest first.
    pub fn thread_ids(&self) -> Vec<String> {
        let mut records: Vec<&AnnotationRecord> = self.records.values().collect();
        records.sort_by(|a, b| a.eviction_key().cmp(&b.eviction_key()));
        records
            .into_iter()
            .map(|record| record.thread_id.clone())
            .collect()
    }

    /// Force out the oldest record regardless of capacity.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let victim = self.oldest_thread_id()?;
        self.records.remove(&victim);
        counter!(METRIC_EVICT_TOTAL).increment(1);
        info!(thread_id = %victim, "Evicted oldest annotation on request");
        self.persist();
        Some(victim)
    }

    /// Drop every record and the stored snapshot.
    pub fn purge(&mut self) {
        self.records.clear();
        self.next_seq = 0;
        remove_table(self.store.as_ref(), Table::Records);
        gauge!(METRIC_RECORDS).set(0.0);
    }

    fn evict_over_capacity(&mut self) -> Vec<String> {
        let mut evicted = Vec::new();
        while self.records.len() > self.capacity.get() {
            let Some(victim) = self.oldest_thread_id() else {
                break;
            };
            self.records.remove(&victim);
            evicted.push(victim);
        }

        if !evicted.is_empty() {
            counter!(METRIC_EVICT_TOTAL).increment(evicted.len() as u64);
            info!(
                evicted = ?evicted,
                capacity = self.capacity.get(),
                "Evicted oldest annotations to stay within capacity"
            );
        }
        evicted
    }

    fn oldest_thread_id(&self) -> Option<String> {
        self.records
            .values()
            .min_by(|a, b| a.eviction_key().cmp(&b.eviction_key()))
            .map(|record| record.thread_id.clone())
    }

    fn persist(&self) {
        let snapshot: BTreeMap<&str, &AnnotationRecord> = self
            .records
            .iter()
            .map(|(thread_id, record)| (thread_id.as_str(), record))
            .collect();
        persist_table(self.store.as_ref(), Table::Records, &snapshot);
        gauge!(METRIC_RECORDS).set(self.records.len() as f64);
    }
}
