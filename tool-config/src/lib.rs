//! Configuration for toolhost servers.
//!
//! [`ConfigLoader`] layers built-in defaults, a project-level `toolhost.toml`,
//! an explicit file, and `TOOLHOST_*` environment variables (in increasing
//! priority) into a validated [`ServerConfig`].

#![warn(missing_docs, clippy::pedantic)]

mod loader;
mod schema;

pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX, PROJECT_CONFIG_FILE};
pub use schema::{
    DispatchSettings, LoggingSettings, ServerConfig, ServerIdentity, TransportMode,
    TransportSettings,
};

use thiserror::Error;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("config file `{path}` does not exist")]
    MissingFile {
        /// Path that was requested.
        path: String,
    },

    /// A provider failed or the merged document did not match the schema.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// Values parsed but violate a constraint.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of the violated constraint.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Result alias for configuration operations.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
