//! # Structured Logging
//!
//! One `tracing` subscriber per process, writing to stderr. Stdout carries
//! command results only, so `status --metrics` can be piped straight into a
//! textfile collector.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormatArg;

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored, one event per line, for a terminal.
    Pretty,
    /// JSON lines.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Installs the global subscriber. Call once, first thing in `main()`.
///
/// `default_level` is an `EnvFilter` directive string such as
/// `"fixed_yield_contracts=info"`; `RUST_LOG` replaces it when set.
pub fn init_logging(default_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (pretty, json) = match format {
        LogFormat::Pretty => (Some(fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry().with(filter).with(pretty).with(json).init();
    tracing::debug!(?format, "logging ready");
}
