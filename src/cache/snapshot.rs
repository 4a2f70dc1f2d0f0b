//! Whole-table snapshot persistence.
//!
//! Every table is serialized to JSON and written under its fixed key. Read and
//! write failures never escape: unreadable snapshots load as empty tables and
//! failed writes leave the in-memory table authoritative.

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::infra::storage::DurableStore;

use super::keys::Table;
use super::metrics::{METRIC_LOAD_FAILURE_TOTAL, METRIC_PERSIST_FAILURE_TOTAL};

/// Load `table` from `store`, falling back to an empty table.
pub(crate) fn load_table<T>(store: &dyn DurableStore, table: Table) -> T
where
    T: DeserializeOwned + Default,
{
    let key = table.storage_key();
    let raw = match store.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(table = table.as_str(), key, "No stored snapshot; starting empty");
            return T::default();
        }
        Err(err) => {
            warn!(
                table = table.as_str(),
                key,
                error = %err,
                "Failed to read annotation snapshot; starting empty"
            );
            counter!(METRIC_LOAD_FAILURE_TOTAL, "table" => table.as_str()).increment(1);
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(
                table = table.as_str(),
                key,
                error = %err,
                "Discarding corrupt annotation snapshot"
            );
            counter!(METRIC_LOAD_FAILURE_TOTAL, "table" => table.as_str()).increment(1);
            T::default()
        }
    }
}

/// Write the full `value` snapshot for `table`. Returns whether it was stored.
pub(crate) fn persist_table<T>(store: &dyn DurableStore, table: Table, value: &T) -> bool
where
    T: Serialize + ?Sized,
{
    let key = table.storage_key();
    let encoded = match serde_json::to_string(value) {
        Ok(encoded) => encoded,
        Err(err) => {
            warn!(
                table = table.as_str(),
                key,
                error = %err,
                "Failed to encode annotation snapshot"
            );
            counter!(METRIC_PERSIST_FAILURE_TOTAL, "table" => table.as_str()).increment(1);
            return false;
        }
    };

    match store.write(key, &encoded) {
        Ok(()) => true,
        Err(err) => {
            warn!(
                table = table.as_str(),
                key,
                bytes = encoded.len(),
                error = %err,
                "Failed to persist annotation snapshot; keeping in-memory state"
            );
            counter!(METRIC_PERSIST_FAILURE_TOTAL, "table" => table.as_str()).increment(1);
            false
        }
    }
}

/// Remove the stored snapshot for `table`.
pub(crate) fn remove_table(store: &dyn DurableStore, table: Table) -> bool {
    let key = table.storage_key();
    match store.remove(key) {
        Ok(()) => true,
        Err(err) => {
            warn!(
                table = table.as_str(),
                key,
                error = %err,
                "Failed to remove annotation snapshot"
            );
            false
        }
    }
}
