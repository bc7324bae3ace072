//! Tracing subscriber setup for binaries and integration tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber, honoring `RUST_LOG` and
/// defaulting to `info`. Returns quietly if a subscriber is already set,
/// so tests can call it freely.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
