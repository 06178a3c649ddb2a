// crates/bulk-ingest-config/src/config.rs
// ============================================================================
// Module: Bulk Ingest Configuration
// Description: Configuration loading and validation for the ingest service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: bulk-ingest-core, bulk-ingest-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Table schemas declared under
//! `[[tables]]` are validated here so a bad schema stops startup instead of
//! surfacing on the first import.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use bulk_ingest_core::ServiceLimits;
use bulk_ingest_core::TableSchema;
use bulk_ingest_core::runtime::service::DEFAULT_MAX_BATCH_ROWS;
use bulk_ingest_core::runtime::service::DEFAULT_MAX_PAGE_SIZE;
use bulk_ingest_store_sqlite::SqliteStoreConfig;
use bulk_ingest_store_sqlite::SqliteStoreMode;
use bulk_ingest_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "bulk-ingest.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "BULK_INGEST_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default HTTP bind address.
pub(crate) const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default page size applied when a query omits one.
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Upper bound for `limits.max_batch_rows`.
pub(crate) const MAX_BATCH_ROWS_CEILING: usize = 1_000_000;
/// Upper bound for `limits.max_page_size`.
pub(crate) const MAX_PAGE_SIZE_CEILING: usize = 100_000;
/// Maximum number of tables declared in config.
pub(crate) const MAX_TABLES: usize = 1_024;
/// Upper bound for `server.max_body_bytes`.
pub(crate) const MAX_BODY_BYTES_CEILING: usize = 1024 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Bulk ingest configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Request limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Storage backend configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Table schemas registered at startup.
    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

impl IngestConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.limits.validate()?;
        self.store.validate()?;
        if self.tables.len() > MAX_TABLES {
            return Err(ConfigError::Invalid(format!("tables exceeds {MAX_TABLES} entries")));
        }
        let mut seen = BTreeSet::new();
        for table in &self.tables {
            table
                .validate()
                .map_err(|err| ConfigError::Invalid(format!("tables: {err}")))?;
            if !seen.insert(table.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "tables declares `{}` more than once",
                    table.name
                )));
            }
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind must be non-empty".to_string()));
        }
        self.bind_addr()?;
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_CEILING {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_CEILING}"
            )));
        }
        self.audit.validate()
    }
}

/// Audit logging configuration for HTTP requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

/// Request limits.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum rows accepted by one import or validate call.
    #[serde(default = "default_max_batch_rows")]
    pub max_batch_rows: usize,
    /// Maximum query page size.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    /// Page size applied when a query omits one.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_batch_rows: default_max_batch_rows(),
            max_page_size: default_max_page_size(),
            default_page_size: default_page_size(),
        }
    }
}

impl LimitsConfig {
    /// Returns the limits enforced by the service.
    #[must_use]
    pub const fn service_limits(&self) -> ServiceLimits {
        ServiceLimits {
            max_batch_rows: self.max_batch_rows,
            max_page_size: self.max_page_size,
        }
    }

    /// Validates limit bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_rows == 0 || self.max_batch_rows > MAX_BATCH_ROWS_CEILING {
            return Err(ConfigError::Invalid(format!(
                "limits.max_batch_rows must be between 1 and {MAX_BATCH_ROWS_CEILING}"
            )));
        }
        if self.max_page_size == 0 || self.max_page_size > MAX_PAGE_SIZE_CEILING {
            return Err(ConfigError::Invalid(format!(
                "limits.max_page_size must be between 1 and {MAX_PAGE_SIZE_CEILING}"
            )));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(
                "limits.default_page_size must be between 1 and limits.max_page_size".to_string(),
            ));
        }
        Ok(())
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store configuration, or `None` for memory stores.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a sqlite store has no path.
    pub fn sqlite_config(&self) -> Result<Option<SqliteStoreConfig>, ConfigError> {
        match self.store_type {
            StoreType::Memory => Ok(None),
            StoreType::Sqlite => {
                let path = self.path.clone().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                Ok(Some(SqliteStoreConfig {
                    path,
                    busy_timeout_ms: self.busy_timeout_ms,
                    journal_mode: self.journal_mode,
                    sync_mode: self.sync_mode,
                }))
            }
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())
            }
        }
    }
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use `SQLite`-backed durable store.
    Sqlite,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size (16 MiB).
const fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

/// Default maximum rows per batch.
const fn default_max_batch_rows() -> usize {
    DEFAULT_MAX_BATCH_ROWS
}

/// Default maximum page size.
const fn default_max_page_size() -> usize {
    DEFAULT_MAX_PAGE_SIZE
}

/// Default page size.
const fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Default `SQLite` busy timeout in milliseconds.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use super::IngestConfig;
    use super::MAX_PATH_COMPONENT_LENGTH;
    use super::MAX_TOTAL_PATH_LENGTH;
    use super::StoreType;
    use super::validate_path_string;

    #[test]
    fn empty_config_uses_defaults() {
        let config = IngestConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.limits.default_page_size, 20);
        assert_eq!(config.limits.max_page_size, 1_000);
        assert_eq!(config.store.store_type, StoreType::Memory);
        assert!(config.server.audit.enabled);
        assert!(config.tables.is_empty());
    }

    #[test]
    fn default_page_size_cannot_exceed_max() {
        let result = IngestConfig::from_toml_str(
            "[limits]\nmax_page_size = 10\ndefault_page_size = 20\n",
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("default_page_size"), "unexpected error: {err}");
    }

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        assert!(validate_path_string("test_path", "   ").is_err());
    }

    #[test]
    fn validate_path_string_rejects_exceeds_max_length() {
        let long_path = "a".repeat(MAX_TOTAL_PATH_LENGTH + 1);
        assert!(validate_path_string("test_path", &long_path).is_err());
    }

    #[test]
    fn validate_path_string_rejects_component_too_long() {
        let path = format!("./{}", "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1));
        assert!(validate_path_string("test_path", &path).is_err());
        let path = format!("./{}", "a".repeat(MAX_PATH_COMPONENT_LENGTH));
        assert!(validate_path_string("test_path", &path).is_ok());
    }
}
