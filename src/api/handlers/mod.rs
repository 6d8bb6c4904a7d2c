use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use super::middleware::CurrentUser;
use crate::db::Database;
use crate::models::*;
use crate::session::{AuthBackend, AuthError};

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
///
/// Storage rejections that describe bad input (unknown references, constraint
/// violations) are safe to expose and come back as BAD_REQUEST.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    let msg = e.to_string();

    if msg.contains("not found") || msg.contains("constraint failed") {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg);
    }

    tracing::error!("Internal error: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn auth_error(e: AuthError) -> (StatusCode, String) {
    match e {
        AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, e.to_string()),
        AuthError::EmailTaken => (StatusCode::CONFLICT, e.to_string()),
        AuthError::Backend(_) => internal_error(e),
    }
}

fn bad_request(msg: &str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg.to_string())
}

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{} not found", what))
}

fn required(value: &str, msg: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(bad_request(msg));
    }
    Ok(trimmed.to_string())
}

// ============================================================
// Ownership
// ============================================================

fn owned_site(db: &Database, id: Uuid, user: &User) -> ApiResult<Option<FansubSite>> {
    Ok(db
        .get_site(id)
        .map_err(internal_error)?
        .filter(|s| s.user_id == user.id))
}

fn owned_manga(db: &Database, id: Uuid, user: &User) -> ApiResult<Option<MangaWithSite>> {
    Ok(db
        .get_manga(id)
        .map_err(internal_error)?
        .filter(|m| m.manga.user_id == user.id))
}

fn owned_chapter(db: &Database, id: Uuid, user: &User) -> ApiResult<Option<Chapter>> {
    let Some(chapter) = db.get_chapter(id).map_err(internal_error)? else {
        return Ok(None);
    };
    let owned = owned_manga(db, chapter.manga_id, user)?.is_some();
    Ok(owned.then_some(chapter))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Session
// ============================================================

pub async fn sign_up(
    State(db): State<Database>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<User>)> {
    db.sign_up(credentials)
        .await
        .map(|u| (StatusCode::CREATED, Json(u)))
        .map_err(auth_error)
}

pub async fn sign_in(
    State(db): State<Database>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<AuthSession>> {
    db.sign_in(credentials)
        .await
        .map(Json)
        .map_err(auth_error)
}

pub async fn sign_out(
    State(db): State<Database>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    db.sign_out(&current.access_token)
        .await
        .map_err(auth_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn current_user(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}

// ============================================================
// Fansub Sites
// ============================================================

pub async fn list_sites(
    State(db): State<Database>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<FansubSite>>> {
    db.get_sites_by_user(current.user.id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_site(
    State(db): State<Database>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<CreateSiteInput>,
) -> ApiResult<(StatusCode, Json<FansubSite>)> {
    let input = CreateSiteInput {
        name: required(&input.name, "Name and URL are required")?,
        url: required(&input.url, "Name and URL are required")?,
        description: input.description.filter(|d| !d.trim().is_empty()),
    };

    db.create_site(current.user.id, input)
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(internal_error)
}

pub async fn delete_site(
    State(db): State<Database>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if owned_site(&db, id, &current.user)?.is_none() {
        return Err(not_found("Site"));
    }
    if db.delete_site(current.user.id, id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Site"))
    }
}

// ============================================================
// Mangas
// ============================================================

pub async fn list_mangas(
    State(db): State<Database>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<MangaWithSite>>> {
    db.get_mangas_by_user(current.user.id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_manga(
    State(db): State<Database>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<CreateMangaInput>,
) -> ApiResult<(StatusCode, Json<MangaWithSite>)> {
    let title = required(&input.title, "Title and site are required")?;

    // Other users' sites are reported exactly like missing ones
    if owned_site(&db, input.fansub_site_id, &current.user)?.is_none() {
        return Err(bad_request("Fansub site not found"));
    }

    db.create_manga(
        current.user.id,
        CreateMangaInput {
            title,
            fansub_site_id: input.fansub_site_id,
        },
    )
    .map(|m| (StatusCode::CREATED, Json(m)))
    .map_err(internal_error)
}

pub async fn update_manga(
    State(db): State<Database>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<SetMangaActiveInput>,
) -> ApiResult<Json<MangaWithSite>> {
    if owned_manga(&db, id, &current.user)?.is_none() {
        return Err(not_found("Manga"));
    }
    db.set_manga_active(id, input.is_active)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Manga"))
}

pub async fn delete_manga(
    State(db): State<Database>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if owned_manga(&db, id, &current.user)?.is_none() {
        return Err(not_found("Manga"));
    }
    if db.delete_manga(current.user.id, id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Manga"))
    }
}

// ============================================================
// Chapters
// ============================================================

pub async fn list_chapters(
    State(db): State<Database>,
    Extension(current): Extension<CurrentUser>,
    Path(manga_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Chapter>>> {
    if owned_manga(&db, manga_id, &current.user)?.is_none() {
        return Err(not_found("Manga"));
    }
    db.get_chapters_by_manga(manga_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_chapter(
    State(db): State<Database>,
    Extension(current): Extension<CurrentUser>,
    Path(manga_id): Path<Uuid>,
    Json(input): Json<CreateChapterInput>,
) -> ApiResult<(StatusCode, Json<Chapter>)> {
    let chapter_number = required(&input.chapter_number, "Chapter number is required")?;
    if owned_manga(&db, manga_id, &current.user)?.is_none() {
        return Err(not_found("Manga"));
    }

    db.create_chapter(
        manga_id,
        CreateChapterInput {
            chapter_number,
            chapter_title: input.chapter_title.filter(|t| !t.trim().is_empty()),
            release_date: input.release_date,
        },
    )
    .map(|c| (StatusCode::CREATED, Json(c)))
    .map_err(internal_error)
}

pub async fn update_chapter(
    State(db): State<Database>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<SetChapterReadInput>,
) -> ApiResult<Json<Chapter>> {
    if !input.is_consistent() {
        return Err(bad_request(
            "read_at must be set if and only if is_read is true",
        ));
    }
    if owned_chapter(&db, id, &current.user)?.is_none() {
        return Err(not_found("Chapter"));
    }
    db.set_chapter_read(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Chapter"))
}

pub async fn delete_chapter(
    State(db): State<Database>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if owned_chapter(&db, id, &current.user)?.is_none() {
        return Err(not_found("Chapter"));
    }
    if db.delete_chapter(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Chapter"))
    }
}
