//! Metric names emitted by the annotation cache.

pub const METRIC_HIT_TOTAL: &str = "annotation_cache_hit_total";
pub const METRIC_MISS_TOTAL: &str = "annotation_cache_miss_total";
pub const METRIC_EVICT_TOTAL: &str = "annotation_cache_evict_total";
pub const METRIC_PERSIST_FAILURE_TOTAL: &str = "annotation_cache_persist_failure_total";
pub const METRIC_LOAD_FAILURE_TOTAL: &str = "annotation_cache_load_failure_total";
pub const METRIC_RECORDS: &str = "annotation_cache_records";
