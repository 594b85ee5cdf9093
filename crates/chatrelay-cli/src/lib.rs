//! Shared setup for the `chatrelay-server` and `chatrelay-client` binaries.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (e.g. `"info"`)
/// applies to everything.
///
/// # Errors
/// Fails if `default_level` isn't a valid filter or a global subscriber
/// is already installed.
pub fn init_logging(default_level: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))
}
