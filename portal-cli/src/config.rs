//! `portal.toml` loading.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection = "portal.db"
//!
//! [logging]
//! level = "info"
//! file = "portal.log"
//!
//! [auth]
//! contact_hint = "@Direction on Discord"
//! ```
//!
//! Every key is optional. Command-line flags win over the file.

use std::path::{Path, PathBuf};

use portal_core::auth::binding::DEFAULT_CONTACT_HINT;
use portal_core::db::DbConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "portal.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub backend: String,
    /// Backend-specific; for SQLite a file path, a `sqlite:` URL or `:memory:`.
    pub connection: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection: "portal.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Who users should contact to get a device binding reset.
    pub contact_hint: String,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            contact_hint: DEFAULT_CONTACT_HINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub auth: AuthSection,
}

/// Values given on the command line; `None` keeps the file's value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub backend: Option<String>,
    pub db: Option<String>,
    pub log_level: Option<String>,
}

impl PortalConfig {
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(path, &text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(backend) = overrides.backend {
            self.database.backend = backend;
        }
        if let Some(db) = overrides.db {
            self.database.connection = db;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            backend: self.database.backend.clone(),
            connection_string: self.database.connection.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = PortalConfig::from_toml(Path::new("portal.toml"), "").unwrap();

        assert_eq!(config, PortalConfig::default());
        assert_eq!(config.database.connection, "portal.db");
        assert_eq!(config.auth.contact_hint, DEFAULT_CONTACT_HINT);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = r#"
            [database]
            connection = "/var/lib/portal/portal.db"

            [logging]
            file = "/var/log/portal.log"
        "#;

        let config = PortalConfig::from_toml(Path::new("portal.toml"), text).unwrap();

        assert_eq!(config.database.backend, "sqlite");
        assert_eq!(config.database.connection, "/var/lib/portal/portal.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, Some(PathBuf::from("/var/log/portal.log")));
    }

    #[test]
    fn malformed_file_reports_path() {
        let result = PortalConfig::from_toml(Path::new("bad.toml"), "[database\n");

        let err = result.expect_err("should not parse");
        assert!(err.to_string().starts_with("invalid config file 'bad.toml'"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = PortalConfig::load(Path::new("/nonexistent/portal.toml")).unwrap();

        assert_eq!(config, PortalConfig::default());
    }

    #[test]
    fn overrides_win_over_file() {
        let mut config = PortalConfig::default();

        config.apply(Overrides {
            backend: None,
            db: Some(":memory:".to_string()),
            log_level: Some("debug".to_string()),
        });

        assert_eq!(
            config.db_config(),
            DbConfig {
                backend: "sqlite".to_string(),
                connection_string: ":memory:".to_string(),
            }
        );
        assert_eq!(config.logging.level, "debug");
    }
}
