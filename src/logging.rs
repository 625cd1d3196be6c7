use std::env;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Variable holding the filter directives, e.g. `debug` or
/// `calorie_lens=trace,reqwest=info`.
pub const LOG_ENV: &str = "CALORIE_LOG";
const DEFAULT_FILTER: &str = "info";

/// Filter from `CALORIE_LOG`, falling back to `info` when unset or invalid.
pub fn env_filter() -> EnvFilter {
    let directives = env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Logs go to stderr so that stdout carries
/// only results.
///
/// Calling it twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init_logger() {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(env_filter())
        .try_init();
}
