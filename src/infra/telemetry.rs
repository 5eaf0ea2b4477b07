use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "blockpress_cache_hit_total",
            Unit::Count,
            "Total number of content cache hits."
        );
        describe_counter!(
            "blockpress_cache_miss_total",
            Unit::Count,
            "Total number of content cache misses, expired entries included."
        );
        describe_counter!(
            "blockpress_cache_expired_total",
            Unit::Count,
            "Total number of content cache entries dropped after their TTL."
        );
        describe_counter!(
            "blockpress_cache_invalidated_total",
            Unit::Count,
            "Total number of content cache entries removed by deletion or invalidation."
        );
        describe_counter!(
            "blockpress_webhook_received_total",
            Unit::Count,
            "Total number of change notifications accepted by the webhook."
        );
        describe_histogram!(
            "blockpress_render_ms",
            Unit::Milliseconds,
            "Document render and sanitize latency in milliseconds."
        );
    });
}
