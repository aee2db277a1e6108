//! Tracing setup for tests

use tracing_subscriber::EnvFilter;
use virtual_scheduler::DEFAULT_LOG_LEVEL;

/// Install a fmt subscriber writing through the test harness
///
/// `RUST_LOG` wins over `default_filter`. Calling it again is a no-op.
pub fn init_test_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}
