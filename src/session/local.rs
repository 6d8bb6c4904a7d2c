//! [`AuthBackend`] on the local [`Database`].
//!
//! Passwords are stored as Argon2 PHC strings. Access tokens are 32 random
//! bytes, base64url encoded, kept until sign-out.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;

use super::{AuthBackend, AuthError};
use crate::db::{self, Database};
use crate::models::{AuthSession, Credentials, User};

#[async_trait]
impl AuthBackend for Database {
    async fn sign_up(&self, credentials: Credentials) -> Result<User, AuthError> {
        credentials.validate().map_err(AuthError::Validation)?;

        let email = credentials.normalized_email();
        if self.find_user_credentials(&email).map_err(backend)?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let hash = hash_password(&credentials.password)?;
        self.create_user(&email, &hash).map_err(signup_failed)
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<AuthSession, AuthError> {
        let Some((user, hash)) = self
            .find_user_credentials(&credentials.email)
            .map_err(backend)?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&credentials.password, &hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = generate_token();
        self.create_access_token(user.id, &access_token)
            .map_err(backend)?;

        Ok(AuthSession { access_token, user })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.revoke_access_token(access_token).map_err(backend)?;
        Ok(())
    }

    async fn resolve(&self, access_token: &str) -> Result<Option<User>, AuthError> {
        self.user_for_token(access_token).map_err(backend)
    }
}

fn backend(e: anyhow::Error) -> AuthError {
    AuthError::Backend(format!("{:#}", e))
}

/// A concurrent sign-up can claim the email between the lookup and the
/// insert; the users table's UNIQUE constraint catches it.
fn signup_failed(e: anyhow::Error) -> AuthError {
    if db::is_unique_violation(&e) {
        AuthError::EmailTaken
    } else {
        backend(e)
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Backend(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn generate_token() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;

    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
