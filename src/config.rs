use crate::constants::{
    DEFAULT_CONFIG_PATH, DEFAULT_DATABASE_PATH, DEFAULT_DOCS_POINTER, DEFAULT_HTTP_TIMEOUT_SECONDS,
    DEFAULT_KEYSPACE, DEFAULT_ROWS, DEFAULT_TABLE,
};
use crate::error::{ImporterError, Result};
use crate::normalize::NormalizerSettings;
use crate::source::{BatchShape, FileSource, HttpSource, SourceReader};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub target: TargetConfig,
    pub normalize: NormalizerSettings,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Export saved to disk
    pub path: Option<PathBuf>,
    /// Solr select endpoint
    pub url: Option<String>,
    pub docs_pointer: String,
    pub rows: usize,
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            url: None,
            docs_pointer: DEFAULT_DOCS_POINTER.to_string(),
            rows: DEFAULT_ROWS,
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub keyspace: String,
    pub table: String,
    /// Local database file, used when no remote URL is set
    pub database_path: String,
    pub database_url: Option<String>,
    pub auth_token: Option<String>,
    /// DDL template replacing the built-in one
    pub schema_template: Option<PathBuf>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            keyspace: DEFAULT_KEYSPACE.to_string(),
            table: DEFAULT_TABLE.to_string(),
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            database_url: None,
            auth_token: None,
            schema_template: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus listen address; metrics are off when unset
    pub addr: Option<String>,
}

impl Config {
    /// Load from `path`, or from `doc_importer.toml` if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Path::new(DEFAULT_CONFIG_PATH),
            None => return Ok(Self::default()),
        };
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ImporterError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Let environment variables override the file.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty("LIBSQL_URL") {
            self.target.database_url = Some(url);
        }
        if let Some(token) = non_empty("LIBSQL_AUTH_TOKEN") {
            self.target.auth_token = Some(token);
        }
        if let Some(addr) = non_empty("DOC_IMPORTER_METRICS_ADDR") {
            self.metrics.addr = Some(addr);
        }
    }

    pub fn metrics_addr(&self) -> Result<Option<SocketAddr>> {
        self.metrics
            .addr
            .as_deref()
            .map(|addr| {
                addr.parse().map_err(|e| {
                    ImporterError::Config(format!("invalid metrics address '{addr}': {e}"))
                })
            })
            .transpose()
    }
}

impl SourceConfig {
    pub fn shape(&self) -> BatchShape {
        BatchShape {
            docs_pointer: self.docs_pointer.clone(),
            rows: self.rows,
        }
    }

    /// Exactly one of `path` and `url` must be set.
    pub fn reader(&self) -> Result<Box<dyn SourceReader>> {
        match (&self.path, &self.url) {
            (Some(path), None) => Ok(Box::new(FileSource::new(path.clone(), self.shape()))),
            (None, Some(url)) => Ok(Box::new(
                HttpSource::new(url.clone(), self.shape())
                    .with_timeout(Duration::from_secs(self.timeout_seconds)),
            )),
            (Some(_), Some(_)) => Err(ImporterError::Config(
                "source.path and source.url are mutually exclusive".to_string(),
            )),
            (None, None) => Err(ImporterError::Config(
                "no source configured: set source.path or source.url".to_string(),
            )),
        }
    }
}

#[cfg(feature = "db")]
impl TargetConfig {
    pub fn table_ref(&self) -> Result<crate::db::TableRef> {
        crate::db::TableRef::new(&self.keyspace, &self.table)
    }

    pub fn database_target(&self) -> Result<crate::db::DatabaseTarget> {
        match &self.database_url {
            Some(url) => {
                let auth_token = self.auth_token.clone().ok_or_else(|| {
                    ImporterError::Config(
                        "LIBSQL_AUTH_TOKEN is required with a remote database URL".to_string(),
                    )
                })?;
                Ok(crate::db::DatabaseTarget::Remote {
                    url: url.clone(),
                    auth_token,
                })
            }
            None => Ok(crate::db::DatabaseTarget::Local(self.database_path.clone())),
        }
    }
}
