//! DataCite client configuration.
//!
//! The service URL points at the `/dois` collection endpoint. Credentials
//! are a repository account id and password, sent as HTTP basic auth.
//! Override via environment variables or explicit construction for
//! staging and test servers.

use base64::{engine::general_purpose, Engine as _};
use url::Url;
use zeroize::Zeroizing;

/// Production DataCite `/dois` endpoint.
pub const DEFAULT_SERVICE_URL: &str = "https://api.datacite.org/dois";

/// Configuration for connecting to a DataCite-style registration service.
///
/// Custom `Debug` implementation redacts the `client_secret` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct DataCiteConfig {
    /// URL of the `/dois` collection endpoint.
    /// Default: <https://api.datacite.org/dois>
    pub service_url: Url,
    /// Repository account id, e.g. `EHRI.BLOG`.
    pub client_id: String,
    /// Repository account password.
    pub client_secret: Zeroizing<String>,
    /// Request timeout in seconds. `None` leaves the HTTP client default.
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for DataCiteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCiteConfig")
            .field("service_url", &self.service_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DataCiteConfig {
    /// Explicit configuration with no timeout override.
    pub fn new(
        service_url: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            service_url,
            client_id: client_id.into(),
            client_secret: Zeroizing::new(client_secret.into()),
            timeout_secs: None,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `DATACITE_SERVICE_URL` (default: `https://api.datacite.org/dois`)
    /// - `DATACITE_CLIENT_ID` (required)
    /// - `DATACITE_CLIENT_SECRET` (required)
    /// - `DATACITE_TIMEOUT_SECS` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = std::env::var("DATACITE_CLIENT_ID")
            .map_err(|_| ConfigError::MissingVar("DATACITE_CLIENT_ID"))?;
        let client_secret = std::env::var("DATACITE_CLIENT_SECRET")
            .map_err(|_| ConfigError::MissingVar("DATACITE_CLIENT_SECRET"))?;

        Ok(Self {
            service_url: env_url("DATACITE_SERVICE_URL", DEFAULT_SERVICE_URL)?,
            client_id,
            client_secret: Zeroizing::new(client_secret),
            timeout_secs: std::env::var("DATACITE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
        })
    }

    /// The `client_id:client_secret` pair, base64-encoded for the
    /// `Authorization: Basic` header.
    pub fn basic_auth_token(&self) -> Zeroizing<String> {
        let pair = Zeroizing::new(format!("{}:{}", self.client_id, self.client_secret.as_str()));
        Zeroizing::new(general_purpose::STANDARD.encode(pair.as_bytes()))
    }

    /// Fail early on configurations that cannot authenticate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::MissingVar("client_id"));
        }
        if self.client_secret.is_empty() {
            return Err(ConfigError::MissingVar("client_secret"));
        }
        Ok(())
    }
}

pub(crate) fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingVar(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("credentials cannot be sent as an HTTP header")]
    InvalidCredentials,
    #[error("HTTP client could not be built: {0}")]
    HttpClient(String),
}
