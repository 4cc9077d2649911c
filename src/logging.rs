//! Logging configuration using tracing

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const QUIET_TARGETS: [&str; 3] = ["hyper=warn", "reqwest=warn", "lopdf=warn"];

/// `-v` count to the default level; `RUST_LOG` still wins.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Logs go to stderr, stdout is kept for the report.
pub fn init_logging(verbosity: u8) {
    let env_filter = QUIET_TARGETS
        .iter()
        .filter_map(|d| d.parse().ok())
        .fold(
            EnvFilter::builder()
                .with_default_directive(level_for(verbosity).into())
                .from_env_lossy(),
            EnvFilter::add_directive,
        );

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
