//! Structured logging setup.
//!
//! The engine itself only emits `tracing` events; embedders that do not bring
//! their own subscriber can call [`init_logging`] once at startup.
//!
//! ## Environment Variables
//!
//! - `BRRTD_LOG_LEVEL`: trace/debug/info/warn/error (default: `info`)
//! - `BRRTD_LOG_FORMAT`: `json` (default) or `pretty`
//! - `BRRTD_LOG_MODE`: `all` (default) or `error-only`
//! - `BRRTD_LOG_TARGET_FILTER`: comma-separated `EnvFilter` directives
//! - `BRRTD_LOG_INCLUDE_LOCATION`: include file:line (default: `false`)

use anyhow::{Context, Result};
use std::env;
use tracing::{Level, Metadata, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Which events are emitted at all, independent of level filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Log everything the level filter allows
    All,
    /// Log only WARN and ERROR
    ErrorOnly,
}

impl LogMode {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error-only" | "error_only" => LogMode::ErrorOnly,
            _ => LogMode::All,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    /// Log format: json/pretty
    pub format: LogFormat,
    pub mode: LogMode,
    /// Extra `EnvFilter` directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            mode: LogMode::All,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("BRRTD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("BRRTD_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            ),
            mode: LogMode::parse(&env::var("BRRTD_LOG_MODE").unwrap_or_default()),
            target_filter: env::var("BRRTD_LOG_TARGET_FILTER").ok(),
            include_location: env::var("BRRTD_LOG_INCLUDE_LOCATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        }
    }

    /// Verbose, human-readable configuration for local development
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            mode: LogMode::All,
            target_filter: None,
            include_location: true,
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        if let Some(target_filter) = &self.target_filter {
            for filter in target_filter.split(',').map(str::trim) {
                if filter.is_empty() {
                    continue;
                }
                match filter.parse() {
                    Ok(directive) => env_filter = env_filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {filter}"),
                }
            }
        }
        env_filter
    }
}

/// Drops everything below WARN when the mode is [`LogMode::ErrorOnly`].
struct ModeLayer {
    mode: LogMode,
}

impl<S> Layer<S> for ModeLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        match self.mode {
            LogMode::All => true,
            LogMode::ErrorOnly => matches!(*metadata.level(), Level::WARN | Level::ERROR),
        }
    }
}

/// Install the global `tracing` subscriber.
///
/// Returns an error if a global subscriber is already installed.
///
/// ```no_run
/// use brrtdispatch::logging::{init_logging, LogConfig};
///
/// init_logging(&LogConfig::from_env()).expect("logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let registry = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(ModeLayer { mode: config.mode });

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    registry
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")
}
