use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Utc;
use manga_tracker::api::create_router;
use manga_tracker::db::Database;
use manga_tracker::models::*;
use uuid::Uuid;

fn setup() -> TestServer {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let app = create_router(db);
    TestServer::new(app).expect("Failed to create test server")
}

/// Sign up and sign in, returning the bearer token.
async fn sign_in(server: &TestServer, email: &str) -> String {
    let credentials = Credentials::new(email, "secret123");
    server
        .post("/api/v1/auth/sign-up")
        .json(&credentials)
        .await
        .assert_status(StatusCode::CREATED);

    server
        .post("/api/v1/auth/sign-in")
        .json(&credentials)
        .await
        .json::<AuthSession>()
        .access_token
}

async fn create_test_site(server: &TestServer, token: &str) -> FansubSite {
    server
        .post("/api/v1/sites")
        .authorization_bearer(token)
        .json(&CreateSiteInput::new("Alpha", "https://a.example"))
        .await
        .json::<FansubSite>()
}

async fn create_test_manga(server: &TestServer, token: &str) -> MangaWithSite {
    let site = create_test_site(server, token).await;
    server
        .post("/api/v1/mangas")
        .authorization_bearer(token)
        .json(&CreateMangaInput::new("Test Manga", site.id))
        .await
        .json::<MangaWithSite>()
}

async fn create_test_chapter(
    server: &TestServer,
    token: &str,
    manga_id: Uuid,
    number: &str,
) -> Chapter {
    server
        .post(&format!("/api/v1/mangas/{}/chapters", manga_id))
        .authorization_bearer(token)
        .json(&CreateChapterInput::new(number))
        .await
        .json::<Chapter>()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn does_not_require_a_session() {
        let server = setup();
        let response = server.get("/api/v1/health").await;

        response.assert_status_ok();
        response.assert_json(&serde_json::json!({ "status": "ok" }));
    }
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn sign_up_returns_the_normalized_user() {
        let server = setup();
        let response = server
            .post("/api/v1/auth/sign-up")
            .json(&Credentials::new("Reader@Example.com", "secret123"))
            .await;

        response.assert_status(StatusCode::CREATED);
        let user: User = response.json();
        assert_eq!(user.email, "reader@example.com");
    }

    #[tokio::test]
    async fn duplicate_sign_up_conflicts() {
        let server = setup();
        sign_in(&server, "reader@example.com").await;

        server
            .post("/api/v1/auth/sign-up")
            .json(&Credentials::new("reader@example.com", "secret123"))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invalid_credentials_are_a_bad_request() {
        let server = setup();
        server
            .post("/api/v1/auth/sign-up")
            .json(&Credentials::new("not-an-email", "secret123"))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let server = setup();
        sign_in(&server, "reader@example.com").await;

        server
            .post("/api/v1/auth/sign-in")
            .json(&Credentials::new("reader@example.com", "wrong-password"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_identifies_the_user() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;

        let response = server
            .get("/api/v1/auth/user")
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<User>().email, "reader@example.com");
    }

    #[tokio::test]
    async fn sign_out_revokes_the_token() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;

        server
            .post("/api/v1/auth/sign-out")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get("/api/v1/auth/user")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn requests_without_a_token_are_unauthorized() {
        let server = setup();

        server
            .get("/api/v1/sites")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/api/v1/mangas")
            .authorization_bearer("made-up-token")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}

mod sites {
    use super::*;

    #[tokio::test]
    async fn create_and_list() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;

        let response = server
            .post("/api/v1/sites")
            .authorization_bearer(&token)
            .json(&CreateSiteInput::new("Alpha", "https://a.example").with_description("Group"))
            .await;
        response.assert_status(StatusCode::CREATED);
        let site: FansubSite = response.json();
        assert_eq!(site.description, Some("Group".to_string()));

        let sites: Vec<FansubSite> = server
            .get("/api/v1/sites")
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(sites, vec![site]);
    }

    #[tokio::test]
    async fn blank_name_is_a_bad_request() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;

        let response = server
            .post("/api/v1/sites")
            .authorization_bearer(&token)
            .json(&CreateSiteInput::new("  ", "https://a.example"))
            .await;

        response.assert_status_bad_request();
        response.assert_text("Name and URL are required");
    }

    #[tokio::test]
    async fn delete_then_delete_again() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;
        let site = create_test_site(&server, &token).await;

        server
            .delete(&format!("/api/v1/sites/{}", site.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&format!("/api/v1/sites/{}", site.id))
            .authorization_bearer(&token)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn other_users_sites_are_invisible() {
        let server = setup();
        let reader = sign_in(&server, "reader@example.com").await;
        let other = sign_in(&server, "other@example.com").await;
        let site = create_test_site(&server, &reader).await;

        let sites: Vec<FansubSite> = server
            .get("/api/v1/sites")
            .authorization_bearer(&other)
            .await
            .json();
        assert!(sites.is_empty());

        server
            .delete(&format!("/api/v1/sites/{}", site.id))
            .authorization_bearer(&other)
            .await
            .assert_status_not_found();

        server
            .post("/api/v1/mangas")
            .authorization_bearer(&other)
            .json(&CreateMangaInput::new("Stolen", site.id))
            .await
            .assert_status_bad_request();
    }
}

mod mangas {
    use super::*;

    #[tokio::test]
    async fn created_manga_carries_the_site_name() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;
        let manga = create_test_manga(&server, &token).await;

        assert!(manga.manga.is_active);
        assert_eq!(manga.site_name(), Some("Alpha"));

        let response = server
            .get("/api/v1/mangas")
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body[0]["title"], "Test Manga");
        assert_eq!(body[0]["fansub_sites"]["name"], "Alpha");
    }

    #[tokio::test]
    async fn unknown_site_is_a_bad_request() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;

        let response = server
            .post("/api/v1/mangas")
            .authorization_bearer(&token)
            .json(&CreateMangaInput::new("Test Manga", Uuid::new_v4()))
            .await;

        response.assert_status_bad_request();
        response.assert_text("Fansub site not found");
    }

    #[tokio::test]
    async fn patch_sets_the_active_flag() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;
        let manga = create_test_manga(&server, &token).await;

        let response = server
            .patch(&format!("/api/v1/mangas/{}", manga.manga.id))
            .authorization_bearer(&token)
            .json(&SetMangaActiveInput { is_active: false })
            .await;

        response.assert_status_ok();
        let updated: MangaWithSite = response.json();
        assert!(!updated.manga.is_active);
    }

    #[tokio::test]
    async fn patch_of_unknown_manga_is_not_found() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;

        server
            .patch(&format!("/api/v1/mangas/{}", Uuid::new_v4()))
            .authorization_bearer(&token)
            .json(&SetMangaActiveInput { is_active: false })
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn deleting_the_site_deletes_its_mangas() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;
        let manga = create_test_manga(&server, &token).await;

        server
            .delete(&format!("/api/v1/sites/{}", manga.manga.fansub_site_id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let mangas: Vec<MangaWithSite> = server
            .get("/api/v1/mangas")
            .authorization_bearer(&token)
            .await
            .json();
        assert!(mangas.is_empty());
    }
}

mod chapters {
    use super::*;

    #[tokio::test]
    async fn listed_by_number_as_text() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;
        let manga = create_test_manga(&server, &token).await;

        create_test_chapter(&server, &token, manga.manga.id, "10").await;
        create_test_chapter(&server, &token, manga.manga.id, "9").await;

        let chapters: Vec<Chapter> = server
            .get(&format!("/api/v1/mangas/{}/chapters", manga.manga.id))
            .authorization_bearer(&token)
            .await
            .json();
        let numbers: Vec<&str> = chapters.iter().map(|c| c.chapter_number.as_str()).collect();
        assert_eq!(numbers, vec!["9", "10"]);
    }

    #[tokio::test]
    async fn blank_number_is_a_bad_request() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;
        let manga = create_test_manga(&server, &token).await;

        server
            .post(&format!("/api/v1/mangas/{}/chapters", manga.manga.id))
            .authorization_bearer(&token)
            .json(&CreateChapterInput::new(" "))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn patch_marks_read_and_unread() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;
        let manga = create_test_manga(&server, &token).await;
        let chapter = create_test_chapter(&server, &token, manga.manga.id, "1").await;

        let read: Chapter = server
            .patch(&format!("/api/v1/chapters/{}", chapter.id))
            .authorization_bearer(&token)
            .json(&SetChapterReadInput::read(Utc::now()))
            .await
            .json();
        assert!(read.is_read);
        assert!(read.read_at.is_some());

        let unread: Chapter = server
            .patch(&format!("/api/v1/chapters/{}", chapter.id))
            .authorization_bearer(&token)
            .json(&SetChapterReadInput::unread())
            .await
            .json();
        assert!(!unread.is_read);
        assert!(unread.read_at.is_none());
    }

    #[tokio::test]
    async fn inconsistent_read_fields_are_rejected() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;
        let manga = create_test_manga(&server, &token).await;
        let chapter = create_test_chapter(&server, &token, manga.manga.id, "1").await;

        server
            .patch(&format!("/api/v1/chapters/{}", chapter.id))
            .authorization_bearer(&token)
            .json(&SetChapterReadInput { is_read: true, read_at: None })
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn other_users_chapters_are_not_found() {
        let server = setup();
        let reader = sign_in(&server, "reader@example.com").await;
        let other = sign_in(&server, "other@example.com").await;
        let manga = create_test_manga(&server, &reader).await;
        let chapter = create_test_chapter(&server, &reader, manga.manga.id, "1").await;

        server
            .get(&format!("/api/v1/mangas/{}/chapters", manga.manga.id))
            .authorization_bearer(&other)
            .await
            .assert_status_not_found();
        server
            .patch(&format!("/api/v1/chapters/{}", chapter.id))
            .authorization_bearer(&other)
            .json(&SetChapterReadInput::unread())
            .await
            .assert_status_not_found();
        server
            .delete(&format!("/api/v1/chapters/{}", chapter.id))
            .authorization_bearer(&other)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn deleting_the_manga_deletes_its_chapters() {
        let server = setup();
        let token = sign_in(&server, "reader@example.com").await;
        let manga = create_test_manga(&server, &token).await;
        let chapter = create_test_chapter(&server, &token, manga.manga.id, "1").await;

        server
            .delete(&format!("/api/v1/mangas/{}", manga.manga.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .delete(&format!("/api/v1/chapters/{}", chapter.id))
            .authorization_bearer(&token)
            .await
            .assert_status_not_found();
    }
}
