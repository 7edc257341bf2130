//! Logging setup.

use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable (development)
    Text,
    /// JSON structured logging (production)
    Json,
    /// JSON when stdout is not a terminal, text otherwise
    #[default]
    Auto,
}

impl LogFormat {
    fn use_json(self) -> bool {
        match self {
            Self::Json => true,
            Self::Text => false,
            Self::Auto => !std::io::stdout().is_terminal(),
        }
    }
}

/// Installs the global subscriber. Filtering follows `RUST_LOG`, default `info`.
///
/// Call once, at process start.
pub fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if format.use_json() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init();
    } else {
        tracing_subscriber::registry().with(env_filter).with(fmt::layer()).init();
    }
}
