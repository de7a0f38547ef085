//! Development-time tracing for the node binary.
//!
//! Diagnostics go to stderr and stay out of the textual protocol output on
//! stdout; the conformance harness requires a clean stderr, so the default
//! level is `warn` and anything louder is strictly opt-in.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`; `debug = true` (the `-d` flag)
/// overrides both with `debug`. Output: stderr, compact format.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
