//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
    /// Address for a dedicated exporter listener. Without one, metrics are
    /// rendered on the API router at `/metrics`.
    pub listen_addr: Option<SocketAddr>,
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: Option<&MetricsSettings>) -> Self {
        let mut config = Self {
            enabled: settings.and_then(|s| s.enabled).unwrap_or(false),
            listen_addr: settings.and_then(|s| s.port).map(listen_on),
        };

        if let Some(enabled) = parse_bool_env("HERITAGE_METRICS_ENABLED") {
            config.enabled = enabled;
        }
        if let Some(port) = std::env::var("HERITAGE_METRICS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.listen_addr = Some(listen_on(port));
        }

        config
    }
}

/// Where installed metrics can be read.
pub enum MetricsHandle {
    /// A dedicated listener serves them.
    Listener(SocketAddr),
    /// The API router renders them through this handle.
    Router(PrometheusHandle),
}

impl MetricsHandle {
    /// Returns the render handle when metrics are served by the API router.
    #[must_use]
    pub const fn router_handle(&self) -> Option<&PrometheusHandle> {
        match self {
            Self::Router(handle) => Some(handle),
            Self::Listener(_) => None,
        }
    }
}

/// Installs the Prometheus recorder, and its HTTP listener if configured.
///
/// A listener needs a Tokio runtime; call this from inside one.
///
/// # Errors
///
/// Returns an error if a recorder is already installed or the listener
/// cannot bind.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<MetricsHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let builder = PrometheusBuilder::new();
    let handle = match config.listen_addr {
        Some(addr) => {
            builder
                .with_http_listener(addr)
                .install()
                .map_err(|e| Error::operation("metrics_listener_install", e))?;
            tracing::info!(addr = %addr, "Prometheus exporter listening");
            MetricsHandle::Listener(addr)
        },
        None => MetricsHandle::Router(
            builder
                .install_recorder()
                .map_err(|e| Error::operation("metrics_recorder_install", e))?,
        ),
    };

    Ok(Some(handle))
}

const fn listen_on(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
}

fn parse_bool_env(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_installs_nothing() {
        let config = MetricsConfig {
            enabled: false,
            listen_addr: None,
        };
        assert!(install_prometheus(&config).unwrap().is_none());
    }

    #[test]
    fn test_from_settings() {
        let settings = MetricsSettings {
            enabled: Some(true),
            port: Some(9100),
        };
        let config = MetricsConfig::from_settings(Some(&settings));
        assert_eq!(config.listen_addr.map(|a| a.port()), Some(9100));
    }
}
