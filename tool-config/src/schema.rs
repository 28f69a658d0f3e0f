//! Strongly typed configuration sections.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ConfigError, Result};

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Name and version reported by discovery endpoints.
    pub server: ServerIdentity,
    /// Which transport to serve and where.
    pub transport: TransportSettings,
    /// Dispatcher and scheduler limits.
    pub dispatch: DispatchSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
    /// Per-client argument overlays keyed by client id.
    pub clients: BTreeMap<String, Map<String, Value>>,
}

impl ServerConfig {
    /// Checks constraints that the type system does not express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty server name, zero
    /// concurrency, a zero call timeout, or a blank log filter.
    pub fn validate(&self) -> Result<()> {
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::invalid("server.name must not be empty"));
        }
        self.dispatch.concurrency_limit()?;
        if self.dispatch.call_timeout_secs == Some(0) {
            return Err(ConfigError::invalid(
                "dispatch.call_timeout_secs must be greater than zero",
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::invalid("logging.filter must not be empty"));
        }
        Ok(())
    }
}

/// Server identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerIdentity {
    /// Human-readable server name.
    pub name: String,
    /// Server version string.
    pub version: String,
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self {
            name: "toolhost".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

/// Transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Newline-delimited JSON over stdin/stdout.
    #[default]
    Stdio,
    /// JSON over HTTP.
    Http,
}

/// Transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Transport to serve.
    pub mode: TransportMode,
    /// Listen address for the HTTP transport.
    pub bind: SocketAddr,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            mode: TransportMode::default(),
            bind: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8080)),
        }
    }
}

/// Dispatch limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Maximum number of calls running at once.
    pub max_concurrency: usize,
    /// Upper bound for a single handler call, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_timeout_secs: Option<u64>,
}

impl DispatchSettings {
    /// Returns the concurrency limit as a non-zero value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `max_concurrency` is zero.
    pub fn concurrency_limit(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.max_concurrency).ok_or_else(|| {
            ConfigError::invalid("dispatch.max_concurrency must be greater than zero")
        })
    }

    /// Returns the call timeout, if one is configured.
    #[must_use]
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 32,
            call_timeout_secs: None,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit ANSI colors.
    pub ansi: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            ansi: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ServerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.transport.mode, TransportMode::Stdio);
        assert_eq!(config.dispatch.concurrency_limit().unwrap().get(), 32);
        assert_eq!(config.dispatch.call_timeout(), None);
    }

    #[test]
    fn rejects_zero_limits() {
        let mut config = ServerConfig::default();
        config.dispatch.max_concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = ServerConfig::default();
        config.dispatch.call_timeout_secs = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_blank_identity_and_filter() {
        let mut config = ServerConfig::default();
        config.server.name = " ".into();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.logging.filter = String::new();
        assert!(config.validate().is_err());
    }
}
