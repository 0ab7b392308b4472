//! HTTP transport for the Shoppy backend.
//!
//! Wraps outbound requests, attaches the session credential as a bearer
//! header, and normalizes HTTP and body-parse failures into [`ApiError`].
//! Stateless beyond the network call: the credential is read from the
//! [`CredentialStore`] on every request.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, instrument};

use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::error::{ApiError, ErrorBody};

/// A successful response body.
///
/// A no-content success (HTTP 204 or a blank body) resolves to
/// [`Body::Empty`], distinct from a parsed JSON `null`, so callers can tell
/// "nothing to show" from "value is null".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Parsed JSON payload.
    Json(serde_json::Value),
    /// No content.
    Empty,
}

/// HTTP client for the backend REST surface.
///
/// Cheap to clone; all clones share one connection pool and one credential
/// store.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

struct TransportInner {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl Transport {
    /// Create a transport with a file-backed credential store at the
    /// configured path.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let store = Arc::new(FileCredentialStore::new(config.credential_path.clone()));
        Self::with_store(config, store)
    }

    /// Create a transport with an explicit credential store.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn with_store(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(TransportInner {
                client,
                base_url: config.api_url.clone(),
                credentials,
            }),
        })
    }

    /// The credential store shared with the session store.
    #[must_use]
    pub fn credentials(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.inner.credentials)
    }

    /// Whether a credential is currently present.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.inner.credentials.load().is_some()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    fn apply_bearer(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.inner.credentials.load() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Issue a JSON request and normalize the response.
    ///
    /// # Errors
    ///
    /// - `ApiError::Network` on transport-level failure
    /// - `ApiError::Status` on a non-success status, carrying the
    ///   best-effort parsed error payload
    /// - `ApiError::Decode` when a success body is not valid JSON
    #[instrument(skip(self, body), fields(method = %method, path = %path))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Body, ApiError> {
        let mut builder = self.apply_bearer(self.inner.client.request(method, self.endpoint(path)));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        Self::read_body(response).await
    }

    /// Submit form-encoded fields and return the raw response.
    ///
    /// The login contract is form-encoded rather than JSON, so status and
    /// body handling stay with the caller.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` on transport-level failure.
    #[instrument(skip(self, form), fields(path = %path))]
    pub async fn submit_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response, ApiError> {
        let builder = self.apply_bearer(self.inner.client.post(self.endpoint(path)));
        let response = builder.form(form).send().await?;
        Ok(response)
    }

    /// Normalize a raw response into [`Body`] or [`ApiError`].
    ///
    /// # Errors
    ///
    /// See [`Transport::request`].
    pub async fn read_body(response: reqwest::Response) -> Result<Body, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            let body = serde_json::from_str::<ErrorBody>(&text).ok();
            return Err(ApiError::Status { status, body });
        }

        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(Body::Empty);
        }

        match serde_json::from_str(&text) {
            Ok(value) => Ok(Body::Json(value)),
            Err(err) => {
                error!(
                    error = %err,
                    body = %text.chars().take(500).collect::<String>(),
                    "Failed to parse backend response"
                );
                Err(ApiError::Decode(err))
            }
        }
    }

    // =========================================================================
    // Typed helpers
    // =========================================================================

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// As [`Transport::request`], plus `ApiError::EmptyBody` when the
    /// backend answers with no content.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None).await?.decode()
    }

    /// `POST` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// As [`Transport::get`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, path, Some(&body)).await?.decode()
    }

    /// `PATCH` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// As [`Transport::get`].
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request(Method::PATCH, path, Some(&body)).await?.decode()
    }

    /// `PUT` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// As [`Transport::get`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request(Method::PUT, path, Some(&body)).await?.decode()
    }

    /// `DELETE` a resource; the result distinguishes no-content from JSON.
    ///
    /// # Errors
    ///
    /// As [`Transport::request`].
    pub async fn delete(&self, path: &str) -> Result<Body, ApiError> {
        self.request(Method::DELETE, path, None).await
    }
}

impl Body {
    /// Decode a JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::EmptyBody` for [`Body::Empty`] and
    /// `ApiError::Decode` when the payload does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Self::Json(value) => serde_json::from_value(value).map_err(ApiError::Decode),
            Self::Empty => Err(ApiError::EmptyBody),
        }
    }
}
