//! Storage key definitions.
//!
//! Each logical table is persisted as one full snapshot under a fixed key.

/// Logical tables owned by the annotation cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Primary annotation records, keyed by thread.
    Records,
    /// Thread → message that last produced the annotation.
    Markers,
    /// Thread → accepted message ids.
    Memberships,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Records, Table::Markers, Table::Memberships];

    /// Key under which the table snapshot is stored.
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Records => "annotations.records.v1",
            Self::Markers => "annotations.markers.v1",
            Self::Memberships => "annotations.memberships.v1",
        }
    }

    /// Short name used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Records => "records",
            Self::Markers => "markers",
            Self::Memberships => "memberships",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn storage_keys_are_distinct() {
        let keys: HashSet<_> = Table::ALL.iter().map(|t| t.storage_key()).collect();
        assert_eq!(keys.len(), Table::ALL.len());
    }
}
