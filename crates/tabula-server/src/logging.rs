//! Structured logging for the Tabula server
//!
//! Console output for development, JSON for production, and optional daily
//! rolling log files.

use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE: &str = "tabula-server.log";

/// Noisy third-party crates are capped at warn.
const QUIET: &[&str] = &["hyper=warn", "tokio=warn", "runtime=warn", "tower=warn", "h2=warn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// JSON format for production (structured logging)
    Json,
    Compact,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    File,
    Both,
}

impl LogOutput {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_OUTPUT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("file") => LogOutput::File,
            Some("both") => LogOutput::Both,
            _ => LogOutput::Stdout,
        }
    }
}

fn env_filter() -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in QUIET {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

fn stdout_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Pretty => fmt::layer().pretty().with_thread_ids(true).with_target(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}

fn file_appender() -> RollingFileAppender {
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    std::fs::create_dir_all(&log_dir).ok();
    RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE)
}

/// Initialize the global subscriber.
///
/// Environment variables:
/// - `RUST_LOG`: Log level (e.g., "debug", "info", "tabula_server=debug,tabula_algebra=trace")
/// - `LOG_FORMAT`: Output format ("pretty", "json", "compact")
/// - `LOG_OUTPUT`: Where to write logs ("stdout", "file", "both")
/// - `LOG_DIR`: Directory for log files (default: "./logs")
pub fn init() {
    let format = LogFormat::from_env();
    let output = LogOutput::from_env();

    match output {
        LogOutput::Stdout => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(stdout_layer(format))
                .init();
        }
        LogOutput::File => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_writer(file_appender()).with_ansi(false))
                .init();
        }
        LogOutput::Both => {
            let file_layer = fmt::layer()
                .with_writer(file_appender())
                .with_ansi(false)
                .boxed();
            tracing_subscriber::registry()
                .with(env_filter())
                .with(stdout_layer(format))
                .with(file_layer)
                .init();
        }
    }

    tracing::info!(format = ?format, output = ?output, "logging initialized");
    tracing::debug!(
        rust_log = %std::env::var("RUST_LOG").unwrap_or_else(|_| "not set".to_string()),
        log_dir = %std::env::var("LOG_DIR").unwrap_or_else(|_| "not set".to_string()),
        "logging environment"
    );
}
