//! Diagnostic logging setup.
//!
//! Library code only emits `tracing` events. Binaries call [`init`] once at
//! startup to print them to stderr, filtered by the `TOOLTREE_LOG`
//! environment variable (`warn` when unset), e.g.
//! `TOOLTREE_LOG=tooltree_dispatch=debug`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "TOOLTREE_LOG";

const DEFAULT_FILTER: &str = "warn";

/// The filter built from [`LOG_ENV`], or the default.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the stderr subscriber. Fails if a global subscriber is already set.
pub fn try_init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
}

/// Installs the stderr subscriber unless one is already set.
pub fn init() {
    let _ = try_init();
}
