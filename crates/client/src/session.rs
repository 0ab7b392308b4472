//! Session store: owns the authenticated identity and its lifecycle.
//!
//! States: `Uninitialized -> Loading -> {Anonymous, Authenticated}`;
//! `Authenticated -> Anonymous` on logout or account deletion;
//! `Authenticated -> Authenticated` on profile update (identity replaced,
//! not merged). The identity lives inside the `Authenticated` variant, so
//! "identity is present iff authenticated" holds by construction.

use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use crate::credentials::CredentialStoreError;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::Identity;

/// Session lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Before bootstrap has been attempted.
    #[default]
    Uninitialized,
    /// Bootstrap in progress.
    Loading,
    /// No credential, or the persisted credential was rejected.
    Anonymous,
    /// Logged in as the carried identity.
    Authenticated(Identity),
}

impl SessionState {
    /// The identity, when authenticated.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Operation requires an authenticated session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Credential persistence failed.
    #[error("credential storage error: {0}")]
    Credential(#[from] CredentialStoreError),

    /// Backend request failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// One display string for the invoking view.
    #[must_use]
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            Self::InvalidCredentials => "Invalid email or password".to_owned(),
            Self::Api(err) => err.display_message(fallback),
            Self::NotAuthenticated | Self::Credential(_) => fallback.to_owned(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    full_name: Option<&'a str>,
    password: &'a str,
}

/// Current values of the profile form, compared against the last known
/// server identity to build a minimal patch.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub email: String,
    pub full_name: String,
    /// Blank means "keep the current password".
    pub password: String,
}

/// Minimal profile patch: only the fields that changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfileUpdate {
    /// Whether the patch carries no changes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_none() && self.full_name.is_none() && self.password.is_none()
    }
}

/// Diff the profile form against the last known server identity.
///
/// Email and full name are included only when they differ from the server
/// value; the password only when non-blank. The result is a partial patch -
/// never a full replace.
#[must_use]
pub fn compute_profile_diff(current: &ProfileForm, original: &Identity) -> ProfileUpdate {
    let original_full_name = original.full_name.as_deref().unwrap_or_default();

    ProfileUpdate {
        email: (current.email != original.email).then(|| current.email.clone()),
        full_name: (current.full_name != original_full_name).then(|| current.full_name.clone()),
        password: (!current.password.trim().is_empty()).then(|| current.password.clone()),
    }
}

/// Owner of the current authenticated identity.
///
/// Cheap to clone; all clones observe the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    transport: Transport,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Create a session store over the given transport.
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                transport,
                state: RwLock::new(SessionState::Uninitialized),
            }),
        }
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        self.inner.state.read().await.clone()
    }

    /// The authenticated identity, if any.
    pub async fn current_user(&self) -> Option<Identity> {
        self.inner.state.read().await.identity().cloned()
    }

    /// Whether the session is authenticated.
    pub async fn is_authenticated(&self) -> bool {
        matches!(&*self.inner.state.read().await, SessionState::Authenticated(_))
    }

    async fn set_state(&self, state: SessionState) {
        *self.inner.state.write().await = state;
    }

    /// Resolve the persisted credential into an identity at process start.
    ///
    /// A rejected or expired credential is discarded and the session settles
    /// `Anonymous` - terminal for this boot cycle, never retried.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> SessionState {
        self.set_state(SessionState::Loading).await;

        if self.inner.transport.credentials().load().is_none() {
            self.set_state(SessionState::Anonymous).await;
            return self.state().await;
        }

        match self.inner.transport.get::<Identity>("/auth/me").await {
            Ok(identity) => {
                self.set_state(SessionState::Authenticated(identity)).await;
            }
            Err(err) => {
                warn!(error = %err, "Persisted credential rejected, discarding");
                if let Err(err) = self.inner.transport.credentials().clear() {
                    warn!(error = %err, "Failed to discard credential");
                }
                self.set_state(SessionState::Anonymous).await;
            }
        }

        self.state().await
    }

    /// Exchange credentials for a token, persist it, and load the identity.
    ///
    /// The login contract is form-encoded (`username`/`password` fields),
    /// distinct from the JSON request path. The token is not left persisted
    /// if any step fails.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on a 401, or the underlying
    /// failure otherwise.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let response = self
            .inner
            .transport
            .submit_form("/auth/login", &[("username", email), ("password", password)])
            .await?;

        let token: TokenResponse = match Transport::read_body(response).await {
            Ok(body) => body.decode()?,
            Err(err) if err.is_unauthorized() => return Err(AuthError::InvalidCredentials),
            Err(err) => return Err(err.into()),
        };

        self.inner
            .transport
            .credentials()
            .store(&SecretString::from(token.access_token))?;

        match self.inner.transport.get::<Identity>("/auth/me").await {
            Ok(identity) => {
                self.set_state(SessionState::Authenticated(identity.clone()))
                    .await;
                Ok(identity)
            }
            Err(err) => {
                // The token must not outlive a failed login.
                if let Err(err) = self.inner.transport.credentials().clear() {
                    warn!(error = %err, "Failed to discard credential");
                }
                Err(err.into())
            }
        }
    }

    /// Create an account. Does not authenticate; chain [`Self::login`] to
    /// sign in afterward.
    ///
    /// # Errors
    ///
    /// Returns the backend rejection (duplicate email, weak password).
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        email: &str,
        full_name: Option<&str>,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let identity = self
            .inner
            .transport
            .post(
                "/auth/register",
                &RegisterRequest {
                    email,
                    full_name,
                    password,
                },
            )
            .await?;
        Ok(identity)
    }

    /// Apply a minimal profile patch and replace the identity with the
    /// server's response.
    ///
    /// An empty patch issues no request. Build the patch with
    /// [`compute_profile_diff`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when no session is active, or
    /// the backend rejection.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Identity, AuthError> {
        let current = self
            .current_user()
            .await
            .ok_or(AuthError::NotAuthenticated)?;

        if update.is_empty() {
            return Ok(current);
        }

        let identity: Identity = self.inner.transport.patch("/auth/me", &update).await?;
        self.set_state(SessionState::Authenticated(identity.clone()))
            .await;
        Ok(identity)
    }

    /// Clear the credential and identity and settle `Anonymous`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` if the persisted token cannot be
    /// removed; the in-memory session is cleared regardless.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.set_state(SessionState::Anonymous).await;
        self.inner.transport.credentials().clear()?;
        Ok(())
    }

    /// Delete the account on the backend, then clear local state.
    ///
    /// Local state is untouched when the backend call fails.
    ///
    /// # Errors
    ///
    /// Returns the backend rejection; the session stays authenticated.
    #[instrument(skip(self))]
    pub async fn delete_account(&self) -> Result<(), AuthError> {
        self.inner.transport.delete("/auth/me").await?;
        self.set_state(SessionState::Anonymous).await;
        self.inner.transport.credentials().clear()?;
        Ok(())
    }
}
