mod handlers;
mod middleware;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::db::Database;

pub use middleware::{CurrentUser, SecurityConfig};

/// Router with permissive CORS, for local use and tests.
pub fn create_router(db: Database) -> Router {
    create_router_with_config(db, SecurityConfig::disabled())
}

pub fn create_router_with_config(db: Database, config: SecurityConfig) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/sign-up", post(handlers::sign_up))
        .route("/auth/sign-in", post(handlers::sign_in));

    let protected = Router::new()
        // Session
        .route("/auth/sign-out", post(handlers::sign_out))
        .route("/auth/user", get(handlers::current_user))
        // Fansub sites
        .route("/sites", get(handlers::list_sites))
        .route("/sites", post(handlers::create_site))
        .route("/sites/{id}", delete(handlers::delete_site))
        // Mangas
        .route("/mangas", get(handlers::list_mangas))
        .route("/mangas", post(handlers::create_manga))
        .route("/mangas/{id}", patch(handlers::update_manga))
        .route("/mangas/{id}", delete(handlers::delete_manga))
        .route("/mangas/{id}/chapters", get(handlers::list_chapters))
        .route("/mangas/{id}/chapters", post(handlers::create_chapter))
        // Chapters (by chapter id)
        .route("/chapters/{id}", patch(handlers::update_chapter))
        .route("/chapters/{id}", delete(handlers::delete_chapter))
        .route_layer(from_fn_with_state(
            db.clone(),
            middleware::session_middleware,
        ));

    Router::new()
        .nest("/api/v1", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(config.cors_layer())
        .with_state(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router() -> Router {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        create_router(db)
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = router()
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_need_a_bearer_token() {
        for path in ["/api/v1/auth/user", "/api/v1/sites", "/api/v1/mangas"] {
            let response = router()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", path);
        }
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let response = router()
            .oneshot(Request::get("/api/v2/sites").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
