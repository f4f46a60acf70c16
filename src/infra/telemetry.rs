use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{METRIC_QUERY_CACHE_HIT, METRIC_QUERY_CACHE_MISS};
use crate::client::loader::METRIC_LOADER_FALLBACK;
use crate::client::mutations::METRIC_MUTATION_ROLLBACK;
use crate::config::{LogFormat, LoggingSettings};
use crate::infra::http::middleware::METRIC_HTTP_REQUEST_MS;

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
            METRIC_QUERY_CACHE_HIT,
            Unit::Count,
            "Query cache reads that found an entry."
        );
        describe_counter!(
            METRIC_QUERY_CACHE_MISS,
            Unit::Count,
            "Query cache reads that found nothing."
        );
        describe_counter!(
            METRIC_LOADER_FALLBACK,
            Unit::Count,
            "Server prefetches that failed and seeded an empty list."
        );
        describe_counter!(
            METRIC_MUTATION_ROLLBACK,
            Unit::Count,
            "Optimistic mutations rolled back after a failed request."
        );
        describe_histogram!(
            METRIC_HTTP_REQUEST_MS,
            Unit::Milliseconds,
            "HTTP request latency in milliseconds."
        );
    });
}
