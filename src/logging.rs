//! Process-wide `tracing` setup.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global `tracing` subscriber once per process.
///
/// `RUST_LOG` wins over `default_filter`; an unparsable filter falls back to
/// `info`. Later calls are no-ops.
pub fn init_logging(default_filter: &str) {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
