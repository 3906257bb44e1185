//! Logging setup
//!
//! All diagnostics go to stderr. Stdout carries the report, and in
//! map-worker mode it carries protocol frames, so nothing else may write there.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Install the global stderr subscriber
///
/// `RUST_LOG` wins over `--debug`. Calling this twice is harmless; the
/// second install is ignored.
pub fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
