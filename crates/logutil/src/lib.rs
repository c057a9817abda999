//! Utilities for logging.
use std::sync::Once;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Output format for the global logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    /// Multi-line human readable output.
    Pretty,
    /// Single line per event.
    #[default]
    Compact,
    /// Newline delimited json.
    Json,
}

static GLOBAL_LOGGER: Once = Once::new();

/// Configure the global logger.
///
/// `RUST_LOG` takes precedence over `level`. Only the first call installs a
/// subscriber, subsequent calls are no-ops.
pub fn configure_global_logger(level: Level, mode: LoggingMode) {
    GLOBAL_LOGGER.call_once(|| {
        let env_filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        let builder = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true);

        // Another subscriber may have been installed outside of this crate.
        let _ = match mode {
            LoggingMode::Pretty => builder.pretty().try_init(),
            LoggingMode::Compact => builder.compact().try_init(),
            LoggingMode::Json => builder.json().try_init(),
        };
    });
}

/// Install a subscriber writing through the test harness so output is only
/// shown for failing tests.
pub fn init_test() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::DEBUG.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(env_filter)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_twice_is_noop() {
        configure_global_logger(Level::INFO, LoggingMode::Json);
        configure_global_logger(Level::DEBUG, LoggingMode::Pretty);
        tracing::info!("logger configured");
    }
}
