//! Logging setup for the command line tool.

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Parse log level string to tracing Level.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `RUST_LOG`-style directives when present and valid, else just `level`.
pub fn build_filter(level: &str, directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| {
            EnvFilter::default().add_directive(LevelFilter::from(parse_level(level)).into())
        })
}

/// Log to stderr so stdout stays clean for rendered output.
///
/// `RUST_LOG` wins over the configured `level`.
pub fn init(level: &str) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(level, directives.as_deref());

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .try_init();
}
