//! Session context: the signed-in user and the operations that change it.
//!
//! There is no process-wide "current user". A [`SessionHandle`] is created
//! once and cloned into every component that needs the user identity (the
//! registries, the HTTP client). The [`SessionProvider`] is the only thing that
//! starts or ends the session it holds:
//!
//! ```text
//! SessionProvider::sign_in   ──► handle holds Session { user, token }
//! SessionProvider::sign_out  ──► handle is empty
//! ```

mod local;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{AuthSession, Credentials, User};

/// Authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Authentication backend error: {0}")]
    Backend(String),
}

/// A signed-in user and the bearer token that proves it.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub started_at: DateTime<Utc>,
}

impl From<AuthSession> for Session {
    fn from(auth: AuthSession) -> Self {
        Self {
            user: auth.user,
            access_token: auth.access_token,
            started_at: Utc::now(),
        }
    }
}

/// Shared holder of the current [`Session`], if any.
///
/// Cloning the handle shares the session: a sign-out through one clone is
/// seen by all of them.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that already holds `session`.
    pub fn signed_in(session: Session) -> Self {
        let handle = Self::new();
        handle.begin(session);
        handle
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.read().expect("session lock poisoned").clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner
            .read()
            .expect("session lock poisoned")
            .as_ref()
            .map(|s| s.user.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .expect("session lock poisoned")
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.inner.read().expect("session lock poisoned").is_some()
    }

    fn begin(&self, session: Session) {
        *self.inner.write().expect("session lock poisoned") = Some(session);
    }

    fn end(&self) -> Option<Session> {
        self.inner.write().expect("session lock poisoned").take()
    }
}

/// The identity backend: account creation and bearer tokens.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Create an account. Does not sign the user in.
    async fn sign_up(&self, credentials: Credentials) -> Result<User, AuthError>;

    /// Verify the credentials and issue a bearer token.
    async fn sign_in(&self, credentials: Credentials) -> Result<AuthSession, AuthError>;

    /// Invalidate a bearer token.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// The user a token belongs to, or `None` if the token is unknown.
    async fn resolve(&self, access_token: &str) -> Result<Option<User>, AuthError>;
}

/// Owns the lifecycle of the session held in a [`SessionHandle`].
pub struct SessionProvider {
    backend: Arc<dyn AuthBackend>,
    handle: SessionHandle,
}

impl SessionProvider {
    pub fn new(backend: Arc<dyn AuthBackend>, handle: SessionHandle) -> Self {
        Self { backend, handle }
    }

    /// The handle to inject into registries and clients.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.handle.current_user()
    }

    pub async fn sign_up(&self, credentials: Credentials) -> Result<User, AuthError> {
        credentials.validate().map_err(AuthError::Validation)?;
        let user = self.backend.sign_up(credentials).await?;
        tracing::info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    /// Sign in and begin a session, replacing any previous one.
    pub async fn sign_in(&self, credentials: Credentials) -> Result<Session, AuthError> {
        credentials.validate().map_err(AuthError::Validation)?;
        let session: Session = self.backend.sign_in(credentials).await?.into();
        tracing::info!(user_id = %session.user.id, "Session started");
        self.handle.begin(session.clone());
        Ok(session)
    }

    /// End the session.
    ///
    /// The local session ends even when the backend fails to revoke the
    /// token; that failure is still reported.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.handle.end() else {
            return Ok(());
        };
        tracing::info!(user_id = %session.user.id, "Session ended");

        if let Err(e) = self.backend.sign_out(&session.access_token).await {
            tracing::warn!("Failed to revoke access token: {}", e);
            return Err(e);
        }
        Ok(())
    }

    /// Begin a session from a previously issued token.
    ///
    /// Returns `None`, leaving the handle empty, when the backend no longer
    /// recognises the token.
    pub async fn resume(&self, access_token: &str) -> Result<Option<Session>, AuthError> {
        let Some(user) = self.backend.resolve(access_token).await? else {
            tracing::debug!("Stored access token is no longer valid");
            return Ok(None);
        };

        let session = Session {
            user,
            access_token: access_token.to_string(),
            started_at: Utc::now(),
        };
        self.handle.begin(session.clone());
        Ok(Some(session))
    }
}
