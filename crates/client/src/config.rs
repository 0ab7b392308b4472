//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOPPY_API_URL` - Backend base URL (default: `http://127.0.0.1:8000`)
//! - `SHOPPY_TOKEN_FILE` - Credential token file path (default: `.shoppy_token`)
//! - `SHOPPY_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 30)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TOKEN_FILE: &str = ".shoppy_token";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub api_url: String,
    /// Path of the persisted credential token file.
    pub credential_path: PathBuf,
    /// HTTP request timeout.
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file first when present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `SHOPPY_API_URL` is not a
    /// valid http(s) URL or `SHOPPY_HTTP_TIMEOUT_SECS` is not an integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_url =
            std::env::var("SHOPPY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
        let api_url = validate_api_url("SHOPPY_API_URL", &api_url)?;

        let credential_path = std::env::var("SHOPPY_TOKEN_FILE")
            .map_or_else(|_| PathBuf::from(DEFAULT_TOKEN_FILE), PathBuf::from);

        let timeout_secs = match std::env::var("SHOPPY_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("SHOPPY_HTTP_TIMEOUT_SECS".to_owned(), e.to_string())
            })?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url,
            credential_path,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Build a configuration for a known backend URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not a valid
    /// http(s) URL.
    pub fn for_api_url(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: validate_api_url("api_url", api_url)?,
            credential_path: PathBuf::from(DEFAULT_TOKEN_FILE),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }

    /// Replace the credential token file path.
    #[must_use]
    pub fn with_credential_path(mut self, path: PathBuf) -> Self {
        self.credential_path = path;
        self
    }
}

fn validate_api_url(name: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(name.to_owned(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            name.to_owned(),
            format!("unsupported scheme: {}", url.scheme()),
        ));
    }
    Ok(raw.trim_end_matches('/').to_owned())
}
