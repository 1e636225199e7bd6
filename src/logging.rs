use tracing_subscriber::EnvFilter;

/// Environment variable holding the `tracing` filter directives.
pub const LOG_ENV_VAR: &str = "PHOTOMARK_LOG";
const DEFAULT_DIRECTIVES: &str = "info";

/// Installs the global fmt subscriber. Later calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
