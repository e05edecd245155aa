//! Configuration management.
//!
//! Configuration is layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, or the platform config directory)
//! 3. `HERITAGE_*` environment variables (a `.env` file is loaded first)
//!
//! ```toml
//! [server]
//! port = 3000
//!
//! [graph]
//! backend = "sqlite"
//! path = "/var/lib/heritage-kg/graph.db"
//!
//! [resolver]
//! edit_threshold_short = 0.6
//!
//! [[chat.rules]]
//! keywords = ["敦煌"]
//! response = "敦煌莫高窟始建于十六国时期。"
//! ```

use crate::services::deduplication::LedgerConfig;
use crate::services::fuzzy::ResolverConfig;
use crate::services::voice::{ChatConfig, SpeechConfig};
use crate::storage::GraphBulkheadConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Application directory name under the platform config and data dirs.
const APP_DIR: &str = "heritage-kg";

/// Main configuration for heritage-kg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeritageConfig {
    /// HTTP listener.
    pub server: ServerSettings,
    /// Graph store selection.
    pub graph: GraphSettings,
    /// Fuzzy resolver tuning.
    pub resolver: ResolverConfig,
    /// Request-dedup ledger.
    pub ledger: LedgerConfig,
    /// Store concurrency and deadlines.
    pub bulkhead: GraphBulkheadConfig,
    /// Speech gateway.
    pub speech: SpeechConfig,
    /// Scripted responder rules.
    pub chat: ChatConfig,
    /// Log output.
    pub logging: LoggingSettings,
    /// Prometheus exporter.
    pub metrics: MetricsSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
    /// Maximum request body size in bytes (audio uploads included).
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerSettings {
    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::operation("parse_bind_addr", e))
    }
}

/// Graph store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackendKind {
    /// Process-local, lost on exit.
    #[default]
    Memory,
    /// `SQLite` file.
    Sqlite,
}

impl GraphBackendKind {
    /// Parses a backend name, defaulting to memory.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Self::Sqlite,
            _ => Self::Memory,
        }
    }
}

/// Graph store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Backend to use.
    pub backend: GraphBackendKind,
    /// Database path for the `SQLite` backend.
    pub path: Option<PathBuf>,
    /// JSON graph document imported at startup.
    pub seed_file: Option<PathBuf>,
}

impl GraphSettings {
    /// Returns the database path, falling back to the platform data dir.
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        directories::ProjectDirs::from("", "", APP_DIR).map_or_else(
            || PathBuf::from("heritage-kg.db"),
            |dirs| dirs.data_dir().join("graph.db"),
        )
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `json` or `pretty`.
    pub format: Option<String>,
    /// Filter directive, e.g. `info` or `heritage_kg=debug`.
    pub level: Option<String>,
    /// Log file; logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Whether to install the exporter.
    pub enabled: Option<bool>,
    /// Exporter listen port.
    pub port: Option<u16>,
}

impl HeritageConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from `path`, or the default location when `None`,
    /// then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::operation("parse_config_file", e))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir (`~/.config/heritage-kg/config.toml`
    /// on Linux). Returns defaults if no readable file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(dirs) = directories::ProjectDirs::from("", "", APP_DIR) else {
            return Self::default();
        };
        let path = dirs.config_dir().join("config.toml");
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            },
        }
    }

    /// Applies `HERITAGE_*` environment overrides.
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `HERITAGE_HOST` | `server.host` |
    /// | `HERITAGE_PORT` | `server.port` |
    /// | `HERITAGE_GRAPH_BACKEND` | `graph.backend` |
    /// | `HERITAGE_GRAPH_PATH` | `graph.path` |
    /// | `HERITAGE_GRAPH_SEED` | `graph.seed_file` |
    /// | `HERITAGE_BULKHEAD_*` | see [`GraphBulkheadConfig::with_env_overrides`] |
    /// | `HERITAGE_SPEECH_*` | see [`SpeechConfig::with_env_overrides`] |
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("HERITAGE_HOST") {
            self.server.host = v;
        }
        if let Some(port) = std::env::var("HERITAGE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = std::env::var("HERITAGE_GRAPH_BACKEND") {
            self.graph.backend = GraphBackendKind::parse(&v);
        }
        if let Ok(v) = std::env::var("HERITAGE_GRAPH_PATH") {
            self.graph.path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("HERITAGE_GRAPH_SEED") {
            self.graph.seed_file = Some(PathBuf::from(v));
        }
        self.bulkhead = self.bulkhead.with_env_overrides();
        self.speech = self.speech.with_env_overrides();
        self
    }

    /// Renders the effective configuration as TOML. Secrets are redacted.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::operation("render_config", e))
    }

    /// Sets the graph backend.
    #[must_use]
    pub fn with_graph_backend(mut self, backend: GraphBackendKind) -> Self {
        self.graph.backend = backend;
        self
    }

    /// Sets the `SQLite` database path.
    #[must_use]
    pub fn with_graph_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.graph.path = Some(path.into());
        self
    }
}
