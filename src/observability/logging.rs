//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter when nothing else is configured.
const DEFAULT_LEVEL: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable multi-line output.
    #[default]
    Pretty,
}

impl LogFormat {
    /// Parses a format name, defaulting to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive.
    pub level: String,
    /// Optional log file; stderr otherwise.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from settings with env overrides.
    ///
    /// `RUST_LOG` wins over `HERITAGE_LOG_LEVEL`, which wins over the file.
    /// `verbose` raises the default to `debug`.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let default_level = if verbose { "debug" } else { DEFAULT_LEVEL };
        let mut config = Self {
            format: settings
                .and_then(|s| s.format.as_deref())
                .map(LogFormat::parse)
                .unwrap_or_default(),
            level: settings
                .and_then(|s| s.level.clone())
                .unwrap_or_else(|| default_level.to_string()),
            file: settings.and_then(|s| s.file.clone()),
        };

        if let Ok(v) = std::env::var("HERITAGE_LOG_FORMAT") {
            config.format = LogFormat::parse(&v);
        }
        if let Ok(v) = std::env::var("HERITAGE_LOG_FILE") {
            config.file = Some(PathBuf::from(v));
        }
        if let Some(v) = std::env::var("RUST_LOG")
            .ok()
            .or_else(|| std::env::var("HERITAGE_LOG_LEVEL").ok())
        {
            config.level = v;
        }

        config
    }

    /// Builds the filter, falling back to `info` on a bad directive.
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
    }
}
