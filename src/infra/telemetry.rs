use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub const CACHE_HIT_TOTAL: &str = "quire_cache_hit_total";
pub const CACHE_MISS_TOTAL: &str = "quire_cache_miss_total";
pub const CACHE_DEGRADED_TOTAL: &str = "quire_cache_degraded_total";
pub const CACHE_POPULATE_FAILED_TOTAL: &str = "quire_cache_populate_failed_total";
pub const CATEGORY_RELOAD_TOTAL: &str = "quire_category_reload_total";

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
            CACHE_HIT_TOTAL,
            Unit::Count,
            "Entity cache reads answered from the key-value cache."
        );
        describe_counter!(
            CACHE_MISS_TOTAL,
            Unit::Count,
            "Entity cache reads that fell through to the store."
        );
        describe_counter!(
            CACHE_DEGRADED_TOTAL,
            Unit::Count,
            "Entity cache reads that hit a cache transport error."
        );
        describe_counter!(
            CACHE_POPULATE_FAILED_TOTAL,
            Unit::Count,
            "Best-effort cache writes that failed."
        );
        describe_counter!(
            CATEGORY_RELOAD_TOTAL,
            Unit::Count,
            "Full reloads of the category collection."
        );
    });
}
