//! Logging setup for pool processes.
//!
//! Both roles log to stderr, so a worker's stdout stays its user's. The filter
//! comes from `POOLVISOR_LOG`, then `RUST_LOG`, then defaults to `info`.
//! Workers inherit the master's environment, so one variable tunes the whole pool.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "POOLVISOR_LOG";

fn build_filter() -> EnvFilter {
    [LOG_ENV, EnvFilter::DEFAULT_ENV]
        .into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Installs the global `tracing` subscriber.
///
/// Idempotent: returns quietly if a subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// poolvisor::logging::init();
/// tracing::info!("pool starting");
/// ```
pub fn init() {
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(build_filter())
        .with(layer)
        .try_init();
}
