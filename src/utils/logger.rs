// Process-wide logging setup. Only the binary calls this; the library logs
// through its injected observer.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::DEFAULT_LOG_FILTER;

/// Install a stderr `fmt` subscriber filtered by `filter` (RUST_LOG syntax).
///
/// Falls back to the default filter when `filter` does not parse.
pub fn init_logger(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
