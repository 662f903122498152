//! Platform configuration (`entcore.conf`) resolution.
//!
//! The file is a JSON document with a top-level `services` array. The explorer
//! module is the first entry whose `name` starts with
//! [`EXPLORER_SERVICE_PREFIX`]; its `config` object carries everything the
//! index tooling needs. The resource catalog connection, used by the
//! duplicate cleanup, comes from the `postgresConfig` object of the first
//! [`INFRA_SERVICE_PREFIX`] service.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::apps::{AppId, selectable_apps};

/// Default location of the platform configuration.
pub const DEFAULT_CONF_PATH: &str = "/srv/vertx/entcore/conf/entcore.conf";

/// Service name prefix of the explorer module.
pub const EXPLORER_SERVICE_PREFIX: &str = "com.opendigitaleducation~explorer";

/// Service name prefix of the infrastructure module.
pub const INFRA_SERVICE_PREFIX: &str = "org.entcore~infra";

/// Index prefix the platform falls back to when `index-prefix` is not set.
pub const DEFAULT_INDEX_PREFIX: &str = "resource-";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file {} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "No explorer service (com.opendigitaleducation~explorer) found in configuration file {}",
        .path.display()
    )]
    ServiceNotFound { path: PathBuf },

    #[error("Invalid explorer configuration in {}: {source}", .path.display())]
    InvalidSection {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Explorer configuration in {} has no search engine URI", .path.display())]
    MissingEngineUri { path: PathBuf },

    #[error("Invalid postgresConfig in {}: {source}", .path.display())]
    InvalidPostgresSection {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "No postgresConfig in the org.entcore~infra service of configuration file {}",
        .path.display()
    )]
    MissingPostgres { path: PathBuf },
}

/// Search engine endpoint and credentials, built once per run.
#[derive(Clone, PartialEq, Eq)]
pub struct EngineConnection {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for EngineConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConnection")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Resource catalog database settings of the platform.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct PostgresConnection {
    pub host: String,
    #[serde(default = "default_postgres_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(rename = "ssl-mode", default)]
    pub ssl_mode: Option<String>,
}

fn default_postgres_port() -> u16 {
    5432
}

impl PostgresConnection {
    /// TLS is used unless the platform explicitly disables it.
    pub fn uses_tls(&self) -> bool {
        !self
            .ssl_mode
            .as_deref()
            .is_some_and(|mode| mode.eq_ignore_ascii_case("disable"))
    }
}

impl fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Explorer module settings relevant to index maintenance.
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Externally reachable platform URL.
    pub host: String,
    /// Configured applications, in configuration order.
    pub applications: Vec<AppId>,
    pub index_prefix: String,
    pub engine: EngineConnection,
    /// Absent when the infra service carries no `postgresConfig`.
    pub postgres: Option<PostgresConnection>,
}

#[derive(Debug, Deserialize)]
struct ConfFile {
    #[serde(default)]
    services: Vec<ServiceEntry>,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    config: serde_json::Value,
}

impl ServiceEntry {
    fn has_prefix(&self, prefix: &str) -> bool {
        self.name.as_deref().unwrap_or_default().starts_with(prefix)
    }
}

fn postgres_section(
    services: &[ServiceEntry],
    path: &Path,
) -> Result<Option<PostgresConnection>, ConfigError> {
    let Some(section) = services
        .iter()
        .find(|service| service.has_prefix(INFRA_SERVICE_PREFIX))
        .and_then(|service| service.config.get("postgresConfig"))
    else {
        return Ok(None);
    };
    PostgresConnection::deserialize(section)
        .map(Some)
        .map_err(|source| ConfigError::InvalidPostgresSection {
            path: path.to_path_buf(),
            source,
        })
}

#[derive(Debug, Deserialize)]
struct ExplorerSection {
    #[serde(default)]
    host: String,
    #[serde(default)]
    applications: Vec<String>,
    #[serde(rename = "index-prefix")]
    index_prefix: Option<String>,
    #[serde(rename = "elasticsearchConfig")]
    elasticsearch_config: ElasticsearchSection,
}

#[derive(Debug, Deserialize)]
struct ElasticsearchSection {
    #[serde(default)]
    uris: Vec<String>,
    user: Option<String>,
    password: Option<String>,
}

impl ExplorerConfig {
    /// Load the explorer section from a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Reading platform configuration.");
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents, path)
    }

    /// Parse configuration contents; `path` is only used in error messages.
    pub fn from_json_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let file: ConfFile = serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let postgres = postgres_section(&file.services, path)?;

        let service = file
            .services
            .into_iter()
            .find(|service| service.has_prefix(EXPLORER_SERVICE_PREFIX))
            .ok_or_else(|| ConfigError::ServiceNotFound {
                path: path.to_path_buf(),
            })?;

        let section: ExplorerSection =
            serde_json::from_value(service.config).map_err(|source| {
                ConfigError::InvalidSection {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        let url = section
            .elasticsearch_config
            .uris
            .into_iter()
            .next()
            .ok_or_else(|| ConfigError::MissingEngineUri {
                path: path.to_path_buf(),
            })?;

        let config = Self {
            host: section.host,
            applications: section.applications.iter().map(|app| AppId::new(app.as_str())).collect(),
            index_prefix: section
                .index_prefix
                .unwrap_or_else(|| DEFAULT_INDEX_PREFIX.to_string()),
            engine: EngineConnection {
                url,
                user: section.elasticsearch_config.user,
                password: section.elasticsearch_config.password,
            },
            postgres,
        };
        debug!(
            applications = config.applications.len(),
            index_prefix = %config.index_prefix,
            engine = %config.engine.url,
            postgres = config.postgres.is_some(),
            "Loaded explorer configuration."
        );
        Ok(config)
    }

    /// Resource catalog settings, required by commands that read it.
    pub fn require_postgres(&self, path: &Path) -> Result<&PostgresConnection, ConfigError> {
        self.postgres
            .as_ref()
            .ok_or_else(|| ConfigError::MissingPostgres {
                path: path.to_path_buf(),
            })
    }

    /// Identifiers an operator may select for this platform.
    pub fn app_choices(&self) -> Vec<AppId> {
        selectable_apps(&self.applications)
    }
}
