//! Logging setup for function binaries.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `krm_fn=debug`.
pub const LOG_ENV: &str = "KRM_FN_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Installs a stderr subscriber filtered by [`LOG_ENV`]. Stdout is left to
/// the ResourceList. Calling it twice is harmless.
pub fn init() {
    let env = std::env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let filter = EnvFilter::from_str(&env).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
