//! Structured logging.
//!
//! `RUST_LOG` wins when set. Otherwise the configured level applies to this
//! crate and `tower_http`, and `--debug` forces `debug` for both.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
pub fn init(level: &str, debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level, debug));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
    if let Err(e) = result {
        eprintln!("logging already initialised: {}", e);
    }
}

fn default_filter(level: &str, debug: bool) -> EnvFilter {
    let level = if debug { "debug" } else { level };
    EnvFilter::new(format!("vhost_proxy={level},tower_http={level}"))
}
