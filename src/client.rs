//! HTTP client for the tracker API.
//!
//! [`TrackerClient`] implements both [`TrackerStore`] and [`AuthBackend`], so
//! registries and the session provider can run against a remote server the
//! same way they run against a local [`Database`](crate::db::Database).
//!
//! The bearer token is read from the injected [`SessionHandle`] on every
//! request; the `owner` arguments of [`TrackerStore`] are not sent because the
//! server scopes every request to the token's user.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;
use crate::session::{AuthBackend, AuthError, SessionHandle};
use crate::store::TrackerStore;

/// Default URL for local development.
pub const DEFAULT_URL: &str = "http://localhost:17020/api/v1";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: sign in again")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Server error: {0}")]
    Server(String),
}

#[derive(Debug, Clone)]
pub struct TrackerClient {
    base_url: String,
    session: SessionHandle,
    client: Client,
}

impl TrackerClient {
    pub fn new(base_url: impl Into<String>, session: SessionHandle) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request, authenticated if a session is active.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(token) = self.session.access_token() {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn error_for(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(body),
            StatusCode::BAD_REQUEST => ClientError::BadRequest(body),
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::CONFLICT => ClientError::Conflict(body),
            _ => ClientError::Server(format!("{}: {}", status, body)),
        }
    }

    /// Handle response, converting HTTP errors to ClientError.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_for(response).await)
        }
    }

    /// Like [`handle_response`](Self::handle_response), with 404 as `None`.
    async fn handle_optional<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Option<T>, ClientError> {
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::handle_response(response).await.map(Some)
    }

    /// Handle a 204 response to a delete, with 404 as `false`.
    async fn handle_delete(response: reqwest::Response) -> Result<bool, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(Self::error_for(response).await)
        }
    }

    pub async fn health(&self) -> Result<(), ClientError> {
        let response = self.request(Method::GET, "/health").send().await?;
        Self::handle_response::<serde_json::Value>(response).await?;
        Ok(())
    }

    /// The user the current token belongs to.
    pub async fn current_user(&self) -> Result<User, ClientError> {
        let response = self.request(Method::GET, "/auth/user").send().await?;
        Self::handle_response(response).await
    }

    // ============================================================
    // Fansub Site Operations
    // ============================================================

    pub async fn list_sites(&self) -> Result<Vec<FansubSite>, ClientError> {
        let response = self.request(Method::GET, "/sites").send().await?;
        Self::handle_response(response).await
    }

    pub async fn create_site(&self, input: &CreateSiteInput) -> Result<FansubSite, ClientError> {
        let response = self
            .request(Method::POST, "/sites")
            .json(input)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn delete_site(&self, id: Uuid) -> Result<bool, ClientError> {
        let response = self
            .request(Method::DELETE, &format!("/sites/{}", id))
            .send()
            .await?;
        Self::handle_delete(response).await
    }

    // ============================================================
    // Manga Operations
    // ============================================================

    pub async fn list_mangas(&self) -> Result<Vec<MangaWithSite>, ClientError> {
        let response = self.request(Method::GET, "/mangas").send().await?;
        Self::handle_response(response).await
    }

    pub async fn create_manga(
        &self,
        input: &CreateMangaInput,
    ) -> Result<MangaWithSite, ClientError> {
        let response = self
            .request(Method::POST, "/mangas")
            .json(input)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn set_manga_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<MangaWithSite>, ClientError> {
        let response = self
            .request(Method::PATCH, &format!("/mangas/{}", id))
            .json(&SetMangaActiveInput { is_active })
            .send()
            .await?;
        Self::handle_optional(response).await
    }

    pub async fn delete_manga(&self, id: Uuid) -> Result<bool, ClientError> {
        let response = self
            .request(Method::DELETE, &format!("/mangas/{}", id))
            .send()
            .await?;
        Self::handle_delete(response).await
    }

    // ============================================================
    // Chapter Operations
    // ============================================================

    pub async fn list_chapters(&self, manga_id: Uuid) -> Result<Vec<Chapter>, ClientError> {
        let response = self
            .request(Method::GET, &format!("/mangas/{}/chapters", manga_id))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn create_chapter(
        &self,
        manga_id: Uuid,
        input: &CreateChapterInput,
    ) -> Result<Chapter, ClientError> {
        let response = self
            .request(Method::POST, &format!("/mangas/{}/chapters", manga_id))
            .json(input)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn set_chapter_read(
        &self,
        id: Uuid,
        input: &SetChapterReadInput,
    ) -> Result<Option<Chapter>, ClientError> {
        let response = self
            .request(Method::PATCH, &format!("/chapters/{}", id))
            .json(input)
            .send()
            .await?;
        Self::handle_optional(response).await
    }

    pub async fn delete_chapter(&self, id: Uuid) -> Result<bool, ClientError> {
        let response = self
            .request(Method::DELETE, &format!("/chapters/{}", id))
            .send()
            .await?;
        Self::handle_delete(response).await
    }
}

#[async_trait]
impl TrackerStore for TrackerClient {
    async fn list_sites(&self, _owner: Uuid) -> anyhow::Result<Vec<FansubSite>> {
        Ok(TrackerClient::list_sites(self).await?)
    }

    async fn insert_site(
        &self,
        _owner: Uuid,
        input: CreateSiteInput,
    ) -> anyhow::Result<FansubSite> {
        Ok(self.create_site(&input).await?)
    }

    async fn delete_site(&self, _owner: Uuid, id: Uuid) -> anyhow::Result<bool> {
        Ok(TrackerClient::delete_site(self, id).await?)
    }

    async fn list_mangas(&self, _owner: Uuid) -> anyhow::Result<Vec<MangaWithSite>> {
        Ok(TrackerClient::list_mangas(self).await?)
    }

    async fn insert_manga(
        &self,
        _owner: Uuid,
        input: CreateMangaInput,
    ) -> anyhow::Result<MangaWithSite> {
        Ok(self.create_manga(&input).await?)
    }

    async fn update_manga_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> anyhow::Result<Option<MangaWithSite>> {
        Ok(self.set_manga_active(id, is_active).await?)
    }

    async fn delete_manga(&self, _owner: Uuid, id: Uuid) -> anyhow::Result<bool> {
        Ok(TrackerClient::delete_manga(self, id).await?)
    }

    async fn list_chapters(&self, manga_id: Uuid) -> anyhow::Result<Vec<Chapter>> {
        Ok(TrackerClient::list_chapters(self, manga_id).await?)
    }

    async fn insert_chapter(
        &self,
        manga_id: Uuid,
        input: CreateChapterInput,
    ) -> anyhow::Result<Chapter> {
        Ok(self.create_chapter(manga_id, &input).await?)
    }

    async fn update_chapter_read(
        &self,
        id: Uuid,
        input: SetChapterReadInput,
    ) -> anyhow::Result<Option<Chapter>> {
        Ok(self.set_chapter_read(id, &input).await?)
    }

    async fn delete_chapter(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(TrackerClient::delete_chapter(self, id).await?)
    }
}

#[async_trait]
impl AuthBackend for TrackerClient {
    async fn sign_up(&self, credentials: Credentials) -> Result<User, AuthError> {
        let response = self
            .request(Method::POST, "/auth/sign-up")
            .json(&credentials)
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        Self::handle_response(response).await.map_err(auth_error)
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<AuthSession, AuthError> {
        let response = self
            .request(Method::POST, "/auth/sign-in")
            .json(&credentials)
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        Self::handle_response(response).await.map_err(auth_error)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = format!("{}/auth/sign-out", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        match response.status() {
            // Token already gone on the server
            StatusCode::UNAUTHORIZED => Ok(()),
            status if status.is_success() => Ok(()),
            _ => Err(auth_error(Self::error_for(response).await)),
        }
    }

    async fn resolve(&self, access_token: &str) -> Result<Option<User>, AuthError> {
        let url = format!("{}/auth/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        Self::handle_response(response).await.map(Some).map_err(auth_error)
    }
}

fn auth_error(e: ClientError) -> AuthError {
    match e {
        ClientError::Unauthorized => AuthError::InvalidCredentials,
        ClientError::Conflict(_) => AuthError::EmailTaken,
        ClientError::BadRequest(msg) => AuthError::Validation(msg),
        other => AuthError::Backend(other.to_string()),
    }
}
