//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Initialize tracing for a command-line entrypoint.
///
/// `RUST_LOG` wins when it parses; otherwise `default_directive` (for example
/// `"info"` or `"vllm_extras=debug"`) is used. Does nothing when a global
/// subscriber has already been installed, so tests and embedding binaries can
/// bring their own.
pub fn init_tracing(default_directive: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
