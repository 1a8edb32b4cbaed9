//! Tracing setup.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Map a `LOG_LEVEL` value to a filter, defaulting to INFO
pub fn level_from_str(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|s| s.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::INFO)
}

/// Install the global subscriber
pub fn init() {
    let level = level_from_str(std::env::var("LOG_LEVEL").ok().as_deref());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(level)
        .init();
}
