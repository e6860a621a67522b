//! Logging setup for the `mysql-wire` binary.
//!
//! The library itself only emits `tracing` events; embedding proxies install their own
//! subscriber.

use crate::config::LoggingConfig;
use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a console subscriber. `RUST_LOG` wins over the configured filter.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    tracing::debug!(filter = %config.filter, "Logging initialized");
    Ok(())
}

/// Creates a span for codec operations.
#[macro_export]
macro_rules! span_codec {
    ($name:expr) => {
        tracing::debug_span!("codec", operation = $name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::debug_span!("codec", operation = $name, $($field)*)
    };
}
