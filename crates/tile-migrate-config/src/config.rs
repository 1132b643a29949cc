// crates/tile-migrate-config/src/config.rs
// ============================================================================
// Module: Tile Migrate Configuration
// Description: Configuration loading and validation for tile-migrate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: tile-migrate-core, tile-migrate-store-sqlite, tile-migrate-http, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every operational parameter of a run (registry endpoints, batch size,
//! retry and pacing) comes from here; nothing is hard-fixed in the pipeline.
//! Security posture: config inputs are untrusted; invalid values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tile_migrate_core::PipelineConfig;
use tile_migrate_core::PlanStrategy;
use tile_migrate_core::RetryPolicy;
use tile_migrate_core::pipeline::DEFAULT_BATCH_SIZE;
use tile_migrate_core::pipeline::DEFAULT_BATCH_DELAY;
use tile_migrate_core::pipeline::DEFAULT_ITEM_DELAY;
use tile_migrate_core::pipeline::DEFAULT_MAX_ATTEMPTS;
use tile_migrate_core::pipeline::DEFAULT_RETRY_DELAY;
use tile_migrate_http::HttpRegistryConfig;
use tile_migrate_store_sqlite::SqliteRegistryConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "tile-migrate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TILE_MIGRATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Largest accepted batch size.
pub(crate) const MAX_BATCH_SIZE: usize = 500;
/// Largest accepted attempt bound for reads.
pub(crate) const MAX_ATTEMPTS: u32 = 10;
/// Largest accepted delay of any kind, in milliseconds.
pub(crate) const MAX_DELAY_MS: u64 = 600_000;
/// Largest accepted HTTP request timeout, in milliseconds.
pub(crate) const MAX_HTTP_TIMEOUT_MS: u64 = 120_000;
/// Largest accepted HTTP response size, in bytes.
pub(crate) const MAX_HTTP_RESPONSE_BYTES: usize = 64 * 1024 * 1024;
/// Largest accepted `SQLite` busy timeout, in milliseconds.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Tile migration configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateConfig {
    /// Registry records are read from.
    pub source: RegistryConfig,
    /// Registry records are written to.
    pub destination: RegistryConfig,
    /// Batching and planning settings.
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// Retry settings for registry reads.
    #[serde(default)]
    pub retry: RetrySettings,
    /// Pacing between registry calls.
    #[serde(default)]
    pub pacing: PacingSettings,
    /// Progress event output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MigrateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from `path`, then from `TILE_MIGRATE_CONFIG`, then
    /// defaults to `tile-migrate.toml` in the working directory.
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
        self.source.validate("source")?;
        self.destination.validate("destination")?;
        if let RegistryConfig::Sqlite(destination) = &self.destination
            && destination.read_only
        {
            return Err(ConfigError::Invalid(
                "destination.read_only must be false".to_string(),
            ));
        }
        if let (RegistryConfig::Sqlite(source), RegistryConfig::Sqlite(destination)) =
            (&self.source, &self.destination)
            && source.path == destination.path
        {
            return Err(ConfigError::Invalid(
                "source and destination must not share a sqlite path".to_string(),
            ));
        }
        self.pipeline.validate()?;
        self.retry.validate()?;
        self.pacing.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Returns the core pipeline parameters described by this config.
    #[must_use]
    pub const fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            batch_size: self.pipeline.batch_size,
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                delay: Duration::from_millis(self.retry.delay_ms),
            },
            item_delay: Duration::from_millis(self.pacing.item_delay_ms),
            batch_delay: Duration::from_millis(self.pacing.batch_delay_ms),
            plan_strategy: self.pipeline.planner,
        }
    }
}

/// Registry backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryConfig {
    /// `SQLite` database file.
    Sqlite(SqliteRegistryConfig),
    /// Remote registry over HTTP.
    Http(HttpRegistryConfig),
}

impl RegistryConfig {
    /// Validates one registry section.
    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        match self {
            Self::Sqlite(config) => {
                validate_path_string(&format!("{field}.path"), &config.path.to_string_lossy())?;
                if config.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
                    return Err(ConfigError::Invalid(format!(
                        "{field}.busy_timeout_ms must be at most {MAX_BUSY_TIMEOUT_MS}"
                    )));
                }
                Ok(())
            }
            Self::Http(config) => validate_http(field, config),
        }
    }
}

/// Batching and planning settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSettings {
    /// Maximum records per destination write.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// How pending keys are discovered.
    #[serde(default)]
    pub planner: PlanStrategy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            planner: PlanStrategy::default(),
        }
    }
}

impl PipelineSettings {
    /// Validates batching bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "pipeline.batch_size must be between 1 and {MAX_BATCH_SIZE}"
            )));
        }
        Ok(())
    }
}

/// Retry settings for registry reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    /// Total attempts per read, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

impl RetrySettings {
    /// Validates retry bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "retry.max_attempts must be between 1 and {MAX_ATTEMPTS}"
            )));
        }
        validate_delay("retry.delay_ms", self.delay_ms)
    }
}

/// Pacing between registry calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacingSettings {
    /// Pause between per-id calls in milliseconds.
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
    /// Pause between batches in milliseconds.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            item_delay_ms: default_item_delay_ms(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

impl PacingSettings {
    /// Validates pacing bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_delay("pacing.item_delay_ms", self.item_delay_ms)?;
        validate_delay("pacing.batch_delay_ms", self.batch_delay_ms)
    }
}

/// Destination for progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSink {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Events are discarded.
    None,
}

/// Progress event output settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Selected sink.
    #[serde(default)]
    pub sink: LogSink,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Validates sink and path consistency.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (LogSink::File, Some(path)) => {
                validate_path_string("logging.path", &path.to_string_lossy())
            }
            (LogSink::File, None) => {
                Err(ConfigError::Invalid("logging.sink=file requires logging.path".to_string()))
            }
            (_, Some(_)) => Err(ConfigError::Invalid(
                "logging.path is only valid with logging.sink=file".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

/// Returns the default batch size.
pub(crate) const fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Returns the default read attempt bound.
pub(crate) const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Returns the default retry delay.
pub(crate) fn default_retry_delay_ms() -> u64 {
    duration_ms(DEFAULT_RETRY_DELAY)
}

/// Returns the default per-id delay.
pub(crate) fn default_item_delay_ms() -> u64 {
    duration_ms(DEFAULT_ITEM_DELAY)
}

/// Returns the default inter-batch delay.
pub(crate) fn default_batch_delay_ms() -> u64 {
    duration_ms(DEFAULT_BATCH_DELAY)
}

/// Converts a default delay to whole milliseconds.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
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

/// Validates the resolved path against length limits.
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
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a delay bound.
fn validate_delay(field: &str, value: u64) -> Result<(), ConfigError> {
    if value > MAX_DELAY_MS {
        return Err(ConfigError::Invalid(format!("{field} must be at most {MAX_DELAY_MS}")));
    }
    Ok(())
}

/// Validates an HTTP registry section.
fn validate_http(field: &str, config: &HttpRegistryConfig) -> Result<(), ConfigError> {
    let url = config.base_url.trim();
    if url.is_empty() {
        return Err(ConfigError::Invalid(format!("{field}.base_url must be non-empty")));
    }
    let cleartext = url.get(.. 7).is_some_and(|scheme| scheme.eq_ignore_ascii_case("http://"));
    let secure = url.get(.. 8).is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"));
    if cleartext && !config.allow_insecure_http {
        return Err(ConfigError::Invalid(format!(
            "{field}.base_url uses http; set {field}.allow_insecure_http = true to allow it"
        )));
    }
    if !cleartext && !secure {
        return Err(ConfigError::Invalid(format!("{field}.base_url must use https")));
    }
    if config.timeout_ms == 0 || config.timeout_ms > MAX_HTTP_TIMEOUT_MS {
        return Err(ConfigError::Invalid(format!(
            "{field}.timeout_ms must be between 1 and {MAX_HTTP_TIMEOUT_MS}"
        )));
    }
    if config.max_response_bytes == 0 || config.max_response_bytes > MAX_HTTP_RESPONSE_BYTES {
        return Err(ConfigError::Invalid(format!(
            "{field}.max_response_bytes must be between 1 and {MAX_HTTP_RESPONSE_BYTES}"
        )));
    }
    if config.bearer_token.as_deref().is_some_and(|token| token.trim().is_empty()) {
        return Err(ConfigError::Invalid(format!("{field}.bearer_token must be non-empty")));
    }
    Ok(())
}
