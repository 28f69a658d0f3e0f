//! Multi-source configuration loader.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::debug;

use crate::{ConfigError, Result, ServerConfig};

/// File looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "toolhost.toml";

/// Prefix for environment overrides; `__` separates nested keys.
pub const DEFAULT_ENV_PREFIX: &str = "TOOLHOST_";

/// Builds a [`ServerConfig`] from layered sources.
///
/// Priority, highest first:
/// 1. `TOOLHOST_*` environment variables (e.g. `TOOLHOST_DISPATCH__MAX_CONCURRENCY=8`)
/// 2. Explicit config file
/// 3. Project file `./toolhost.toml`
/// 4. Built-in defaults
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    project_file: Option<PathBuf>,
    explicit_file: Option<PathBuf>,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            project_file: Some(PathBuf::from(PROJECT_CONFIG_FILE)),
            explicit_file: None,
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_owned()),
        }
    }
}

impl ConfigLoader {
    /// Creates a loader with the default sources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an explicit config file that must exist.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    /// Overrides where the optional project file is looked up; `None` skips it.
    #[must_use]
    pub fn with_project_file(mut self, path: Option<PathBuf>) -> Self {
        self.project_file = path;
        self
    }

    /// Overrides the environment prefix; `None` ignores the environment.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: Option<&str>) -> Self {
        self.env_prefix = prefix.map(str::to_owned);
        self
    }

    /// Assembles the provider chain without extracting it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] when the explicit file does not exist.
    pub fn figment(&self) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(ServerConfig::default()));

        if let Some(path) = self.project_file.as_deref().filter(|path| path.exists()) {
            debug!(path = %path.display(), "merging project config");
            figment = figment.merge(Toml::file(path));
        }

        if let Some(path) = self.explicit_file.as_deref() {
            ensure_exists(path)?;
            debug!(path = %path.display(), "merging explicit config");
            figment = figment.merge(Toml::file(path));
        }

        if let Some(prefix) = self.env_prefix.as_deref() {
            figment = figment.merge(Env::prefixed(prefix).split("__"));
        }

        Ok(figment)
    }

    /// Loads and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] for a missing explicit file,
    /// [`ConfigError::Load`] when a source cannot be parsed or does not match
    /// the schema, and [`ConfigError::Invalid`] when validation fails.
    pub fn load(&self) -> Result<ServerConfig> {
        let config: ServerConfig = self.figment()?.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ConfigError::MissingFile {
            path: path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    use crate::TransportMode;

    fn isolated() -> ConfigLoader {
        ConfigLoader::new()
            .with_project_file(None)
            .with_env_prefix(None)
    }

    #[test]
    fn loads_defaults_without_sources() {
        let config = isolated().load().unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn explicit_file_overrides_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join(PROJECT_CONFIG_FILE);
        fs::write(
            &project,
            "[server]\nname = \"project\"\n\n[dispatch]\nmax_concurrency = 4\n",
        )
        .unwrap();
        let explicit = dir.path().join("override.toml");
        fs::write(
            &explicit,
            "[server]\nname = \"explicit\"\n\n[transport]\nmode = \"http\"\nbind = \"0.0.0.0:9000\"\n",
        )
        .unwrap();

        let config = isolated()
            .with_project_file(Some(project))
            .with_file(&explicit)
            .load()
            .unwrap();

        assert_eq!(config.server.name, "explicit");
        assert_eq!(config.dispatch.max_concurrency, 4);
        assert_eq!(config.transport.mode, TransportMode::Http);
        assert_eq!(config.transport.bind.port(), 9000);
    }

    #[test]
    fn reads_client_profiles_and_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toolhost.toml");
        fs::write(
            &path,
            "[dispatch]\ncall_timeout_secs = 5\n\n[clients.tenant-a]\nregion = \"eu-west-1\"\nretries = 3\n",
        )
        .unwrap();

        let config = isolated().with_file(&path).load().unwrap();
        assert_eq!(config.dispatch.call_timeout(), Some(Duration::from_secs(5)));
        let profile = &config.clients["tenant-a"];
        assert_eq!(profile["region"], "eu-west-1");
        assert_eq!(profile["retries"], 3);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = isolated()
            .with_file(dir.path().join("absent.toml"))
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn schema_mismatch_and_invalid_values_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");

        fs::write(&path, "[transport]\nmode = \"carrier-pigeon\"\n").unwrap();
        assert!(matches!(
            isolated().with_file(&path).load(),
            Err(ConfigError::Load(_))
        ));

        fs::write(&path, "[dispatch]\nmax_concurrency = 0\n").unwrap();
        assert!(matches!(
            isolated().with_file(&path).load(),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
