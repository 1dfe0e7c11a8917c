//! Tracing initialization
//!
//! Log level filter comes from `RUST_LOG` (default: `info`).

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Falls back to `info` when `RUST_LOG` is unset or unparseable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
