use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::metrics::{
    METRIC_EVICT_TOTAL, METRIC_HIT_TOTAL, METRIC_LOAD_FAILURE_TOTAL, METRIC_MISS_TOTAL,
    METRIC_PERSIST_FAILURE_TOTAL, METRIC_RECORDS,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register metric descriptions with the installed recorder. Idempotent.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HIT_TOTAL,
            Unit::Count,
            "Total number of annotation lookups that found a record."
        );
        describe_counter!(
            METRIC_MISS_TOTAL,
            Unit::Count,
            "Total number of annotation lookups that found nothing."
        );
        describe_counter!(
            METRIC_EVICT_TOTAL,
            Unit::Count,
            "Total number of annotation records evicted to stay within capacity."
        );
        describe_counter!(
            METRIC_PERSIST_FAILURE_TOTAL,
            Unit::Count,
            "Total number of table snapshots that could not be written to durable storage."
        );
        describe_counter!(
            METRIC_LOAD_FAILURE_TOTAL,
            Unit::Count,
            "Total number of table snapshots discarded at load because they were unreadable."
        );
        describe_gauge!(
            METRIC_RECORDS,
            Unit::Count,
            "Current number of cached annotation records."
        );
    });
}
