//! Diagnostic tracing for the harness binary.
//!
//! Output goes to stderr in compact format. The verdict itself is carried by
//! the process exit status (and the optional JSON report), not by log lines.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `info` so the single pass/fail line is
/// visible; `debug = true` (the `-d` flag) overrides with `debug`.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
