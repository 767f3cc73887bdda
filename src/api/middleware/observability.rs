//! Observability middleware.
//!
//! Installs the global tracing subscriber used by the binary.

use crate::config::LogFormat;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize tracing.
///
/// `RUST_LOG` controls the level (default: info). Output goes to stderr
/// without ANSI colors, as JSON lines when `format` is [`LogFormat::Json`].
pub fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }

    info!(format = ?format, "Tracing initialized");
}
