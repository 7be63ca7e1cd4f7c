//! Observability and logging.
//!
//! Everything goes to stderr: stdout belongs to fragment and command output
//! that the host tool or the user consumes directly.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set; otherwise `warn` by default,
/// or `promem=debug` with `verbose`. Safe to call once per process; later
/// calls are no-ops.
pub fn init(verbose: bool) {
    let default_filter = if verbose { "promem=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    // try_init rather than init: tests and embedding callers may have their
    // own subscriber installed already.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
