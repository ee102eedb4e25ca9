mod common;

use chamber_portal::{
    AppConfig, AppState, BackendState, SessionService, create_router,
    models::{UserAccount, RecordId},
    storage::{MemoryStore, StoreState},
};
use common::{FakeBackend, admin_token, article};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub backend: Arc<FakeBackend>,
    pub client: reqwest::Client,
}

async fn spawn_app(backend: FakeBackend) -> TestApp {
    let backend = Arc::new(backend);
    let sessions = SessionService::new(Arc::new(MemoryStore::new()) as StoreState);
    let state = AppState::new(
        AppConfig::default(),
        backend.clone() as BackendState,
        sessions,
    );
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        backend,
        client: reqwest::Client::new(),
    }
}

fn seeded_backend(permissions: &[&str]) -> FakeBackend {
    FakeBackend {
        news: (1..=7).map(|i| article(i, &format!("خبر {}", i))).collect(),
        circulars: vec![article(100, "تعميم")],
        users: vec![UserAccount {
            id: RecordId::from("u-1"),
            name: "سارة".to_string(),
            ..UserAccount::default()
        }],
        login_token: Some(admin_token(permissions)),
        ..FakeBackend::default()
    }
}

impl TestApp {
    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("request failed")
    }

    async fn login(&self) -> reqwest::Response {
        self.client
            .post(format!("{}/login", self.address))
            .json(&json!({ "email": "admin@bisha.org", "password": "secret" }))
            .send()
            .await
            .expect("request failed")
    }
}

// --- Public ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app(FakeBackend::default()).await;
    let response = app.get("/health").await;
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_news_listing_pages() {
    let app = spawn_app(seeded_backend(&[])).await;

    let first: Value = app.get("/news").await.json().await.unwrap();
    assert_eq!(first["status"], "ready");
    assert_eq!(first["pageNumber"], 1);
    assert_eq!(first["totalPages"], 3);
    assert_eq!(first["items"].as_array().unwrap().len(), 3);

    let third: Value = app.get("/news?page=3").await.json().await.unwrap();
    assert_eq!(third["pageNumber"], 3);
    assert_eq!(third["items"][0]["title"], "خبر 7");

    // Out of range: stays on page 3.
    let ignored: Value = app.get("/news?page=9").await.json().await.unwrap();
    assert_eq!(ignored["pageNumber"], 3);
}

#[tokio::test]
async fn test_news_listing_local_search() {
    let app = spawn_app(seeded_backend(&[])).await;

    let view: Value = app
        .get("/news?search=%D8%AE%D8%A8%D8%B1%202")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(view["items"].as_array().unwrap().len(), 1);
    assert_eq!(view["loadedCount"], 3);
    assert_eq!(view["filter"]["searchTerm"], "خبر 2");
}

#[tokio::test]
async fn test_unknown_feed_is_rejected() {
    let app = spawn_app(FakeBackend::default()).await;
    assert!(app.get("/videos").await.status().is_client_error());
}

#[tokio::test]
async fn test_article_detail_and_missing() {
    let app = spawn_app(seeded_backend(&[])).await;

    let detail: Value = app.get("/circulars/100").await.json().await.unwrap();
    assert_eq!(detail["article"]["title"], "تعميم");
    assert_eq!(detail["displayDate"], "05 مارس 2024");

    let missing = app.get("/news/555").await;
    assert_eq!(missing.status(), 404);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["message"], "الخبر غير موجود");
}

#[tokio::test]
async fn test_carousel_over_first_page() {
    let app = spawn_app(seeded_backend(&[])).await;

    let view: Value = app.get("/news/carousel?width=800").await.json().await.unwrap();
    assert_eq!(view["carousel"]["itemsPerPage"], 2);
    assert_eq!(view["pageCount"], 2);
    assert_eq!(view["items"].as_array().unwrap().len(), 2);

    let next: Value = app
        .client
        .post(format!("{}/news/carousel/next", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(next["carousel"]["page"], 1);
    // Partial final page.
    assert_eq!(next["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_carousel_keeps_first_page_after_paging() {
    let app = spawn_app(seeded_backend(&[])).await;

    let third: Value = app.get("/news?page=3").await.json().await.unwrap();
    assert_eq!(third["pageNumber"], 3);

    let view: Value = app.get("/news/carousel?width=1500").await.json().await.unwrap();
    let titles: Vec<&str> = view["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["خبر 1", "خبر 2", "خبر 3"]);

    // The paged listing is left where the visitor put it.
    let listing: Value = app.get("/news?page=3").await.json().await.unwrap();
    assert_eq!(listing["items"][0]["title"], "خبر 7");
}

// --- Session ---

#[tokio::test]
async fn test_login_session_logout() {
    let app = spawn_app(seeded_backend(&["GetContact", "GetAllUsers"])).await;

    let anonymous: Value = app.get("/session").await.json().await.unwrap();
    assert_eq!(anonymous["state"], "anonymous");

    let logged_in: Value = app.login().await.json().await.unwrap();
    assert_eq!(logged_in["state"], "authenticated");
    assert_eq!(logged_in["isAdmin"], true);

    let nav: Value = app.get("/session/navigation").await.json().await.unwrap();
    let hrefs: Vec<&str> = nav
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["href"].as_str().unwrap())
        .collect();
    assert_eq!(
        hrefs,
        vec!["/admin", "/admin/contact", "/admin/contact/edit", "/admin/clients"]
    );

    let logout = app
        .client
        .post(format!("{}/logout", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(logout.status(), 204);

    let after: Value = app.get("/session").await.json().await.unwrap();
    assert_eq!(after["state"], "anonymous");
    assert!(after["navigation"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_login_is_401() {
    let app = spawn_app(FakeBackend::default()).await;
    let response = app.login().await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_empty_credentials_are_400() {
    let app = spawn_app(seeded_backend(&[])).await;
    let response = app
        .client
        .post(format!("{}/login", app.address))
        .json(&json!({ "email": " ", "password": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert!(app.backend.recorded().is_empty());
}

// --- Admin ---

#[tokio::test]
async fn test_admin_requires_session() {
    let app = spawn_app(seeded_backend(&["GetContact"])).await;
    assert_eq!(app.get("/admin/counts").await.status(), 401);
}

#[tokio::test]
async fn test_admin_action_needs_its_permission() {
    let app = spawn_app(seeded_backend(&["GetContact"])).await;
    app.login().await;

    assert_eq!(app.get("/admin/counts").await.status(), 200);
    assert_eq!(app.get("/admin/users").await.status(), 403);
}

#[tokio::test]
async fn test_create_news_forwards_and_refreshes() {
    let app = spawn_app(seeded_backend(&["AddNewsPaper"])).await;
    app.login().await;
    app.get("/news").await;

    let created = app
        .client
        .post(format!("{}/admin/news", app.address))
        .json(&json!({ "title": "خبر جديد", "content": "نص", "category": "اقتصاد" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);

    let calls = app.backend.recorded();
    assert!(calls.contains(&"create article خبر جديد".to_string()));
    // The shown news listing was fetched again; circulars were never shown.
    assert_eq!(calls.iter().filter(|c| *c == "list news 1").count(), 2);
    assert!(!calls.iter().any(|c| c.starts_with("list circulars")));
}

#[tokio::test]
async fn test_create_news_validates_input() {
    let app = spawn_app(seeded_backend(&["AddNewsPaper"])).await;
    app.login().await;

    let response = app
        .client
        .post(format!("{}/admin/news", app.address))
        .json(&json!({ "title": "", "content": "نص", "category": "اقتصاد" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_update_permissions() {
    let app = spawn_app(seeded_backend(&["GetAllUsers"])).await;
    app.login().await;

    let users: Value = app.get("/admin/users").await.json().await.unwrap();
    assert_eq!(users["items"][0]["name"], "سارة");

    let response = app
        .client
        .put(format!("{}/admin/users/u-1/permissions", app.address))
        .json(&json!({ "permissions": ["GetContact", "AddNewsPaper"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
    assert!(
        app.backend
            .recorded()
            .contains(&"permissions u-1 GetContact,AddNewsPaper".to_string())
    );
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app(FakeBackend::default()).await;
    let doc: Value = app.get("/api-docs/openapi.json").await.json().await.unwrap();
    assert!(doc["paths"]["/login"].is_object());
}

#[tokio::test]
async fn test_add_board_member_from_form() {
    let app = spawn_app(seeded_backend(&[])).await;
    app.login().await;

    let form = reqwest::multipart::Form::new()
        .text("name", "عبدالله")
        .text("possion", "رئيس المجلس")
        .part(
            "image",
            reqwest::multipart::Part::bytes(vec![1, 2, 3]).file_name("photo.jpg"),
        );
    let response = app
        .client
        .post(format!("{}/admin/board", app.address))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    assert!(
        app.backend
            .recorded()
            .contains(&"board عبدالله رئيس المجلس photo.jpg 3".to_string())
    );
}

#[tokio::test]
async fn test_board_member_requires_name_and_position() {
    let app = spawn_app(seeded_backend(&[])).await;
    app.login().await;

    let form = reqwest::multipart::Form::new().text("name", "عبدالله");
    let response = app
        .client
        .post(format!("{}/admin/board", app.address))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert!(!app.backend.recorded().iter().any(|c| c.starts_with("board")));
}

#[tokio::test]
async fn test_upload_file_needs_news_permission() {
    let app = spawn_app(seeded_backend(&["GetContact"])).await;
    app.login().await;

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(vec![1]).file_name("a.png"),
    );
    let response = app
        .client
        .post(format!("{}/admin/files?type=image", app.address))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_upload_file_returns_stored_location() {
    let app = spawn_app(seeded_backend(&["AddNewsPaper"])).await;
    app.login().await;

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(vec![1, 2]).file_name("cover.png"),
    );
    let response = app
        .client
        .post(format!("{}/admin/files?type=image", app.address))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["url"], "/uploads/cover.png");
    assert!(app.backend.recorded().contains(&"upload image cover.png".to_string()));
}
