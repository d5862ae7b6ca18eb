use std::io;

use clap::ValueEnum;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,tower_http=info,axum=info,sqlx=warn";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable, one line per event
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the process subscriber. Respects `RUST_LOG` and writes to stdout.
///
/// Called once by the binary; library code never configures logging.
pub fn init(format: LogFormat) {
    let builder = fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(io::stdout);

    // try_init so a second call (e.g. from tests) is a no-op instead of a panic
    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
