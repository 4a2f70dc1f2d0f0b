//! Annotation records and partial field updates.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Cached annotation for a single conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub thread_id: String,
    #[serde(default)]
    pub components: String,
    #[serde(default)]
    pub tech_description: String,
    #[serde(default)]
    pub pricing: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Insertion sequence; breaks `created_at` ties during eviction.
    #[serde(default)]
    pub seq: u64,
}

impl AnnotationRecord {
    /// Create a record with empty fields, stamped at `now`.
    pub fn new(thread_id: impl Into<String>, now: OffsetDateTime, seq: u64) -> Self {
        Self {
            thread_id: thread_id.into(),
            components: String::new(),
            tech_description: String::new(),
            pricing: String::new(),
            created_at: now,
            updated_at: now,
            seq,
        }
    }

    /// Ordering key used to pick eviction victims, oldest first.
    pub fn eviction_key(&self) -> (OffsetDateTime, u64, &str) {
        (self.created_at, self.seq, self.thread_id.as_str())
    }
}

/// Partial update for an [`AnnotationRecord`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationPatch {
    pub components: Option<String>,
    pub tech_description: Option<String>,
    pub pricing: Option<String>,
}

impl AnnotationPatch {
    pub fn with_components(mut self, value: impl Into<String>) -> Self {
        self.components = Some(value.into());
        self
    }

    pub fn with_tech_description(mut self, value: impl Into<String>) -> Self {
        self.tech_description = Some(value.into());
        self
    }

    pub fn with_pricing(mut self, value: impl Into<String>) -> Self {
        self.pricing = Some(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_none() && self.tech_description.is_none() && self.pricing.is_none()
    }

    /// Merge supplied fields into `record`. Timestamps are the caller's concern.
    pub fn apply_to(&self, record: &mut AnnotationRecord) {
        if let Some(components) = &self.components {
            record.components.clone_from(components);
        }
        if let Some(tech_description) = &self.tech_description {
            record.tech_description.clone_from(tech_description);
        }
        if let Some(pricing) = &self.pricing {
            record.pricing.clone_from(pricing);
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn patch_merges_only_supplied_fields() {
        let mut record = AnnotationRecord::new("t-1", datetime!(2026-03-01 10:00 UTC), 0);
        record.components = "pump".to_string();
        record.pricing = "100".to_string();

        AnnotationPatch::default()
            .with_tech_description("stainless")
            .apply_to(&mut record);

        assert_eq!(record.components, "pump");
        assert_eq!(record.tech_description, "stainless");
        assert_eq!(record.pricing, "100");
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(AnnotationPatch::default().is_empty());
        assert!(!AnnotationPatch::default().with_pricing("").is_empty());
    }

    #[test]
    fn snapshot_without_seq_defaults_to_zero() {
        let raw = r#"{
            "thread_id": "t-9",
            "components": "a",
            "created_at": "2026-03-01T10:00:00Z",
            "updated_at": "2026-03-01T11:00:00Z"
        }"#;
        let record: AnnotationRecord = serde_json::from_str(raw).expect("valid record");
        assert_eq!(record.seq, 0);
        assert_eq!(record.pricing, "");
        assert!(record.created_at < record.updated_at);
    }
}
