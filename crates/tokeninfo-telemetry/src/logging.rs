//! Structured logging setup, matching the teacher's
//! `tracing_subscriber::registry().with(EnvFilter).with(fmt::layer())`
//! startup pattern in `src/main.rs`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global `tracing` subscriber. `format` is `"json"` or
/// anything else for human-readable output, matching `LoggingConfig::format`.
pub fn init(level: &str, format: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    Ok(())
}
