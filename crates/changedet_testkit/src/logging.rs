//! Tracing setup for tests.

use tracing_subscriber::EnvFilter;

/// Installs a test-friendly `fmt` subscriber once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Later calls,
/// or calls after another subscriber was installed, do nothing.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
