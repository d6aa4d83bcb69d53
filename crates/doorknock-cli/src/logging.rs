//! Console logging setup.

use tracing_subscriber::EnvFilter;

/// Initialise human-readable logging to stderr.
///
/// `RUST_LOG` wins over `default_level` when set. Stdout is left to the
/// console's own output.
pub fn init(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
