// crates/tile-migrate-http/src/registry.rs
// ============================================================================
// Module: HTTP Registry
// Description: Blocking JSON-over-HTTP client for remote tile registries.
// Purpose: Reach source and destination registries with strict limits.
// Dependencies: tile-migrate-core, reqwest, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`HttpRegistry`] speaks a small JSON protocol relative to a base URL:
//!
//! - `GET records/ids` returns `{"ids": [..]}`
//! - `GET records/{id}` returns one record, or 404
//! - `POST records/batch` accepts `{"records": [..]}`; 409 means finalized
//! - `GET registry/status` returns `{"finalized": bool, "total_count": n}`
//!
//! Reads classify transport failures, 429, and 5xx as transient. Writes never
//! report transient failures: an ambiguous write outcome is fatal because the
//! pipeline must not resubmit a batch that may have landed.
//!
//! Security posture: responses are untrusted; bodies are size-bounded,
//! redirects are disabled, and cleartext HTTP must be opted into.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::io::Read;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tile_migrate_core::DestinationRegistry;
use tile_migrate_core::Record;
use tile_migrate_core::RegistryError;
use tile_migrate_core::SourceRegistry;
use tile_migrate_core::TileId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default request timeout (ms).
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Default maximum response size, in bytes.
const DEFAULT_MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;
/// Default user agent for outbound requests.
const DEFAULT_USER_AGENT: &str = "tile-migrate/0.1";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for an HTTP registry client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpRegistryConfig {
    /// Registry base URL; endpoint paths are appended to it.
    pub base_url: String,
    /// Allow cleartext HTTP (disabled by default).
    #[serde(default)]
    pub allow_insecure_http: bool,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Optional bearer token sent with every request.
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// User agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl HttpRegistryConfig {
    /// Returns a config with default limits for `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            allow_insecure_http: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            bearer_token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Returns the default request timeout.
pub(crate) const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Returns the default response size limit.
pub(crate) const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Returns the default user agent.
pub(crate) fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP registry errors.
#[derive(Debug, Error)]
pub enum HttpRegistryError {
    /// Client configuration rejected.
    #[error("http registry config error: {0}")]
    Config(String),
    /// Request could not be sent or the response could not be read.
    #[error("http registry transport error: {0}")]
    Transport(String),
    /// Registry answered with a non-success status.
    #[error("http registry status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },
    /// Response body exceeded the configured limit.
    #[error("http registry response exceeds {max_bytes} bytes")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
    },
    /// Response body was not the expected JSON shape.
    #[error("http registry decode error: {0}")]
    Decode(String),
}

impl HttpRegistryError {
    /// Classifies a failed read.
    fn into_read_error(self, id: Option<TileId>) -> RegistryError {
        match &self {
            Self::Transport(_) => RegistryError::Transient(self.to_string()),
            Self::Status {
                status, ..
            } => {
                let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                match id {
                    Some(id) if code == StatusCode::NOT_FOUND => RegistryError::NotFound(id),
                    _ if code == StatusCode::TOO_MANY_REQUESTS || code.is_server_error() => {
                        RegistryError::Transient(self.to_string())
                    }
                    _ => RegistryError::Fatal(self.to_string()),
                }
            }
            Self::Config(_)
            | Self::TooLarge {
                ..
            }
            | Self::Decode(_) => RegistryError::Fatal(self.to_string()),
        }
    }

    /// Classifies a failed write.
    fn into_write_error(self) -> RegistryError {
        match self {
            Self::Status {
                status, ..
            } if status == StatusCode::CONFLICT.as_u16() => RegistryError::Finalized,
            other => RegistryError::Fatal(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Registry status document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStatus {
    /// Finalize flag.
    pub finalized: bool,
    /// Number of stored records.
    pub total_count: u64,
}

/// Id listing document.
#[derive(Debug, Deserialize)]
struct IdListing {
    /// Every stored id.
    ids: Vec<TileId>,
}

/// Batch write request body.
#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    /// Records to write atomically.
    records: &'a [Record],
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Remote registry reached over HTTP.
#[derive(Clone)]
pub struct HttpRegistry {
    /// Client configuration, including limits and policy.
    config: HttpRegistryConfig,
    /// Parsed base URL with a trailing slash.
    base_url: Url,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpRegistry {
    /// Creates a new HTTP registry client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpRegistryError::Config`] when the base URL is invalid or
    /// disallowed, or when the HTTP client cannot be created.
    pub fn new(config: HttpRegistryConfig) -> Result<Self, HttpRegistryError> {
        let base_url = parse_base_url(&config.base_url, config.allow_insecure_http)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| HttpRegistryError::Config(format!("http client build failed: {err}")))?;
        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    /// Fetches the registry status document.
    ///
    /// # Errors
    ///
    /// Returns [`HttpRegistryError`] when the request or decode fails.
    pub fn status(&self) -> Result<RegistryStatus, HttpRegistryError> {
        self.get_json("registry/status")
    }

    /// Fetches every stored id.
    fn ids(&self) -> Result<Vec<TileId>, RegistryError> {
        self.get_json::<IdListing>("records/ids")
            .map(|listing| listing.ids)
            .map_err(|err| err.into_read_error(None))
    }

    /// Fetches one record.
    fn record(&self, id: TileId) -> Result<Record, RegistryError> {
        self.get_json(&format!("records/{id}")).map_err(|err| err.into_read_error(Some(id)))
    }

    /// Fetches the status document for a port read.
    fn read_status(&self) -> Result<RegistryStatus, RegistryError> {
        self.status().map_err(|err| err.into_read_error(None))
    }

    /// Issues a GET and decodes the JSON body.
    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpRegistryError> {
        let url = self.endpoint(path)?;
        let response = self.authorize(self.client.get(url)).send().map_err(transport_error)?;
        let body = self.read_success(response)?;
        serde_json::from_slice(&body).map_err(|err| HttpRegistryError::Decode(err.to_string()))
    }

    /// Issues the batch POST.
    fn post_batch(&self, records: &[Record]) -> Result<(), HttpRegistryError> {
        let url = self.endpoint("records/batch")?;
        let body = serde_json::to_vec(&BatchRequest {
            records,
        })
        .map_err(|err| HttpRegistryError::Decode(err.to_string()))?;
        let request = self.client.post(url).header(CONTENT_TYPE, "application/json").body(body);
        let response = self.authorize(request).send().map_err(transport_error)?;
        self.read_success(response)?;
        Ok(())
    }

    /// Attaches the bearer token, if configured.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Resolves an endpoint path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, HttpRegistryError> {
        self.base_url
            .join(path)
            .map_err(|err| HttpRegistryError::Config(format!("invalid endpoint {path}: {err}")))
    }

    /// Returns the bounded body of a successful response.
    fn read_success(&self, mut response: Response) -> Result<Vec<u8>, HttpRegistryError> {
        let status = response.status();
        let body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        if status.is_success() {
            return Ok(body);
        }
        let message: String = String::from_utf8_lossy(&body).chars().take(256).collect();
        Err(HttpRegistryError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

impl SourceRegistry for HttpRegistry {
    fn list_all_ids(&self) -> Result<Vec<TileId>, RegistryError> {
        self.ids()
    }

    fn get_record(&self, id: TileId) -> Result<Record, RegistryError> {
        self.record(id)
    }

    fn total_count(&self) -> Result<u64, RegistryError> {
        Ok(self.read_status()?.total_count)
    }
}

impl DestinationRegistry for HttpRegistry {
    fn list_existing_ids(&self) -> Result<BTreeSet<TileId>, RegistryError> {
        Ok(self.ids()?.into_iter().collect())
    }

    fn exists(&self, id: TileId) -> Result<bool, RegistryError> {
        match self.record(id) {
            Ok(_) => Ok(true),
            Err(RegistryError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn get_record(&self, id: TileId) -> Result<Record, RegistryError> {
        self.record(id)
    }

    fn write_batch(&self, records: &[Record]) -> Result<(), RegistryError> {
        if records.is_empty() {
            return Err(RegistryError::Fatal("batch is empty".to_string()));
        }
        self.post_batch(records).map_err(HttpRegistryError::into_write_error)
    }

    fn is_finalized(&self) -> Result<bool, RegistryError> {
        Ok(self.read_status()?.finalized)
    }

    fn total_count(&self) -> Result<u64, RegistryError> {
        Ok(self.read_status()?.total_count)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and validates the base URL, normalizing a trailing slash.
fn parse_base_url(raw: &str, allow_http: bool) -> Result<Url, HttpRegistryError> {
    let mut url = Url::parse(raw)
        .map_err(|err| HttpRegistryError::Config(format!("invalid base_url: {err}")))?;
    match url.scheme() {
        "https" => {}
        "http" if allow_http => {}
        "http" => {
            return Err(HttpRegistryError::Config(
                "http base_url requires allow_insecure_http".to_string(),
            ));
        }
        other => {
            return Err(HttpRegistryError::Config(format!("unsupported url scheme: {other}")));
        }
    }
    if url.host_str().is_none() {
        return Err(HttpRegistryError::Config("base_url host required".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(HttpRegistryError::Config(
            "base_url must not carry a query or fragment".to_string(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Converts a reqwest error into a transport error.
fn transport_error(err: reqwest::Error) -> HttpRegistryError {
    HttpRegistryError::Transport(err.to_string())
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, HttpRegistryError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes).map_err(|_| {
        HttpRegistryError::Config("response size limit exceeds u64".to_string())
    })?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(HttpRegistryError::TooLarge {
            max_bytes,
        });
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle.read_to_end(&mut buf).map_err(|err| HttpRegistryError::Transport(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(HttpRegistryError::TooLarge {
            max_bytes,
        });
    }
    if let Some(expected) = expected_len {
        let expected = usize::try_from(expected)
            .map_err(|_| HttpRegistryError::Transport("invalid response length".to_string()))?;
        if buf.len() < expected {
            return Err(HttpRegistryError::Transport("http response truncated".to_string()));
        }
    }
    Ok(buf)
}
