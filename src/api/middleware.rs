//! Bearer-token sessions and CORS for the HTTP API.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::db::Database;
use crate::models::User;

/// Security configuration loaded from environment variables.
#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    /// Allowed CORS origins (from MANGA_TRACKER_CORS_ORIGINS, comma-separated).
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("MANGA_TRACKER_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .filter(|origins| !origins.is_empty());

        Self { cors_origins }
    }

    /// No origin restrictions (for local development/testing).
    pub fn disabled() -> Self {
        Self { cors_origins: None }
    }

    pub fn with_cors_origins(origins: Vec<String>) -> Self {
        Self {
            cors_origins: Some(origins),
        }
    }

    pub fn cors_layer(&self) -> CorsLayer {
        match &self.cors_origins {
            None => CorsLayer::permissive(),
            Some(origins) => {
                let origins: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|o| match o.parse() {
                        Ok(value) => Some(value),
                        Err(_) => {
                            tracing::warn!("Ignoring invalid CORS origin: {}", o);
                            None
                        }
                    })
                    .collect();
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
    }
}

fn parse_origins(s: &str) -> Vec<String> {
    s.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

/// The user a request was authenticated as, inserted by [`session_middleware`].
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: User,
    pub access_token: String,
}

/// Resolve the bearer token into a [`CurrentUser`] or reject with 401.
pub async fn session_middleware(
    State(db): State<Database>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = match bearer_token(&request) {
        Some(token) => token.to_string(),
        None => {
            tracing::warn!("Missing or malformed Authorization header");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    let user = db.user_for_token(&token).map_err(|e| {
        tracing::error!("Failed to resolve access token: {:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let Some(user) = user else {
        tracing::warn!("Unknown access token");
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(CurrentUser {
        user,
        access_token: token,
    });
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
