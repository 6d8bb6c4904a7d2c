use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// An authenticated identity.
///
/// Users are created by sign-up and are only ever referenced by the rest of
/// the model through `user_id` columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Email and password pair used for sign-up and sign-in.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Emails are matched case-insensitively and without surrounding spaces.
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }

    /// Check the shape of the credentials before they reach a backend.
    pub fn validate(&self) -> Result<(), String> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err("A valid email address is required".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Result of a successful sign-in: the bearer token and who it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_email_without_at_sign() {
        let creds = Credentials::new("reader.example.com", "secret123");
        assert!(creds.validate().is_err());
    }

    #[test]
    fn rejects_short_password() {
        let creds = Credentials::new("reader@example.com", "abc");
        let err = creds.validate().unwrap_err();
        assert!(err.contains("at least 6"));
    }

    #[test]
    fn accepts_well_formed_credentials() {
        let creds = Credentials::new("reader@example.com", "secret123");
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = Credentials::new("reader@example.com", "secret123");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret123"));
    }
}
