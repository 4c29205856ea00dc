//! Router-level tests: every request goes through the full middleware
//! stack via `oneshot`, backed by in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use api_adapters::{router, ApiOptions, AppState};
use auth_adapters::{JwtTokenIssuer, RandomCodeGenerator};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use domains::{MockMediaStorage, MockPasswordHasher, Role, StoredMedia, UserRepository};
use serde_json::{json, Value};
use services::{AppServices, Ports, ServiceOptions};
use storage_adapters::{
    MemoryBookingRepo, MemoryConversationRepo, MemoryFavoriteRepo, MemoryFriendRepo, MemoryGameRepo,
    MemoryMessageRepo, MemoryNotificationRepo, MemoryRateLimiter, MemoryReviewRepo, MemoryUserRepo,
};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    ports: Ports,
}

fn hasher() -> MockPasswordHasher {
    let mut hasher = MockPasswordHasher::new();
    hasher.expect_hash().returning(|p| Ok(format!("plain:{p}")));
    hasher.expect_verify().returning(|p, h| h == format!("plain:{p}"));
    hasher
}

fn media() -> MockMediaStorage {
    let mut media = MockMediaStorage::new();
    media.expect_store().returning(|data, content_type| {
        Ok(StoredMedia {
            key: "0f1e.png".into(),
            url: "/uploads/0f/1e/0f1e.png".into(),
            thumbnail_url: None,
            content_type: content_type.to_string(),
            size: data.len() as u64,
        })
    });
    media
}

fn app_with_limit(max_attempts: u32) -> TestApp {
    let ports = Ports {
        users: Arc::new(MemoryUserRepo::new()),
        games: Arc::new(MemoryGameRepo::new()),
        bookings: Arc::new(MemoryBookingRepo::new()),
        reviews: Arc::new(MemoryReviewRepo::new()),
        conversations: Arc::new(MemoryConversationRepo::new()),
        messages: Arc::new(MemoryMessageRepo::new()),
        friends: Arc::new(MemoryFriendRepo::new()),
        notifications: Arc::new(MemoryNotificationRepo::new()),
        favorites: Arc::new(MemoryFavoriteRepo::new()),
        hasher: Arc::new(hasher()),
        tokens: Arc::new(JwtTokenIssuer::new(b"test-secret-test-secret-test-secret", 1)),
        codes: Arc::new(RandomCodeGenerator::default()),
        media: Arc::new(media()),
    };
    let services = AppServices::new(ports.clone(), ServiceOptions { max_upload_bytes: 4096 });
    let limiter = Arc::new(MemoryRateLimiter::new(max_attempts, Duration::from_secs(60)));
    let state = AppState::new(services, limiter);
    let options = ApiOptions { max_upload_bytes: 4096, ..ApiOptions::default() };
    TestApp { router: router(state, &options), ports }
}

fn app() -> TestApp {
    app_with_limit(100)
}

impl TestApp {
    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, json)
    }

    /// Registers a user and returns `(token, id)`.
    async fn register(&self, name: &str) -> (String, Uuid) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "username": name, "email": format!("{name}@example.com"), "password": "password123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let token = body["data"]["token"].as_str().unwrap().to_string();
        let id = body["data"]["user"]["id"].as_str().unwrap().parse().unwrap();
        (token, id)
    }

    async fn set_role(&self, id: Uuid, role: Role) {
        let mut user = self.ports.users.find_by_id(id).await.unwrap().unwrap();
        user.role = role;
        self.ports.users.update(user).await.unwrap();
    }
}

#[tokio::test]
async fn register_login_and_me_use_the_envelope() {
    let app = app();
    let (token, id) = app.register("dungeon_dan").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "dungeon_dan@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app.call(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.to_string());
    assert_eq!(body["data"]["email"], "dungeon_dan@example.com");
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "dungeon_dan@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = app();
    app.register("kate").await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "kate2", "email": "KATE@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn missing_token_and_malformed_input_are_enveloped() {
    let app = app();
    let (status, body) = app.call(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, body) = app.call(Method::GET, "/api/auth/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (token, _) = app.register("ben").await;
    let (status, body) = app.call(Method::GET, "/api/games/not-a-uuid", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .call(Method::POST, "/api/bookings", Some(&token), Some(json!({ "seats": 2 })))
        .await;
    assert!(status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app.call(Method::GET, "/ws", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app.call(Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn login_is_rate_limited_per_ip() {
    let app = app_with_limit(2);
    let attempt = || {
        app.call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "password123" })),
        )
    };
    assert_eq!(attempt().await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(attempt().await.0, StatusCode::UNAUTHORIZED);
    let (status, body) = attempt().await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn friend_request_cannot_be_sent_twice() {
    let app = app();
    let (alice, alice_id) = app.register("alice").await;
    let (bob, bob_id) = app.register("bob").await;

    let app_ref = &app;
    let send = |token: String, to: Uuid| async move {
        app_ref.call(Method::POST, "/api/messages/friend-requests", Some(&token), Some(json!({ "recipient_id": to })))
            .await
    };
    assert_eq!(send(alice.clone(), bob_id).await.0, StatusCode::CREATED);
    assert_eq!(send(alice.clone(), bob_id).await.0, StatusCode::CONFLICT);
    assert_eq!(send(bob.clone(), alice_id).await.0, StatusCode::CONFLICT);

    let (_, incoming) = app.call(Method::GET, "/api/messages/friend-requests", Some(&bob), None).await;
    let request_id = incoming["data"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(incoming["data"][0]["user"]["username"], "alice");

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/messages/friend-requests/{request_id}"),
            Some(&bob),
            Some(json!({ "action": "accept" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(send(bob.clone(), alice_id).await.0, StatusCode::CONFLICT);

    let (_, friends) = app.call(Method::GET, "/api/messages/friends", Some(&alice), None).await;
    assert_eq!(friends["data"][0]["id"], bob_id.to_string());
}

#[tokio::test]
async fn admin_routes_require_the_admin_role() {
    let app = app();
    let (player, player_id) = app.register("pat").await;
    let (admin, admin_id) = app.register("root").await;
    app.set_role(admin_id, Role::Admin).await;

    let (status, _) = app.call(Method::GET, "/api/admin/stats", Some(&player), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/apply-gm",
            Some(&player),
            Some(json!({ "experience": "Ten years of weekly games", "systems": ["D&D 5e"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let review = json!({ "action": "approve" });
    let uri = format!("/api/admin/gm-applications/{player_id}");
    let (status, _) = app.call(Method::PUT, &uri, Some(&player), Some(review.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, pending) = app.call(Method::GET, "/api/admin/gm-applications", Some(&admin), None).await;
    assert_eq!(pending["data"]["total"], 1);

    let (status, body) = app.call(Method::PUT, &uri, Some(&admin), Some(review.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "gm");
    let (status, _) = app.call(Method::PUT, &uri, Some(&admin), Some(review)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, stats) = app.call(Method::GET, "/api/admin/stats", Some(&admin), None).await;
    assert_eq!(stats["data"]["gms"], 1);
    assert_eq!(stats["data"]["admins"], 1);

    let (_, notes) = app.call(Method::GET, "/api/messages/notifications", Some(&player), None).await;
    assert!(notes["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["kind"] == "gm_application_approved"));
}

#[tokio::test]
async fn only_participants_can_read_or_send_messages() {
    let app = app();
    let (alice, _) = app.register("alice").await;
    let (_, bob_id) = app.register("bob").await;
    let (mallory, _) = app.register("mallory").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/messages/conversations",
            Some(&alice),
            Some(json!({ "participant_ids": [bob_id] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/messages/conversations/{id}/messages");

    let (status, _) = app.call(Method::POST, &uri, Some(&alice), Some(json!({ "content": "Session zero Friday?" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.call(Method::GET, &uri, Some(&mallory), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call(Method::POST, &uri, Some(&mallory), Some(json!({ "content": "hi" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::POST, &uri, Some(&alice), Some(json!({ "content": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notifications_belong_to_their_recipient() {
    let app = app();
    let (alice, _) = app.register("alice").await;
    let (bob, bob_id) = app.register("bob").await;
    app.call(Method::POST, "/api/messages/friend-requests", Some(&alice), Some(json!({ "recipient_id": bob_id })))
        .await;

    let (_, count) = app.call(Method::GET, "/api/messages/notifications/unread-count", Some(&bob), None).await;
    assert_eq!(count["data"]["count"], 1);
    let (_, list) = app.call(Method::GET, "/api/messages/notifications", Some(&bob), None).await;
    let id = list["data"][0]["id"].as_str().unwrap().to_string();

    let read_uri = format!("/api/messages/notifications/{id}/read");
    let (status, _) = app.call(Method::PUT, &read_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/messages/notifications/{id}"), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.call(Method::PUT, &read_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_read"], true);
}

#[tokio::test]
async fn avatar_upload_accepts_images_only() {
    let app = app();
    let (token, _) = app.register("kate").await;
    let upload = |content_type: &'static str| {
        let body = format!(
            "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a\"\r\nContent-Type: {content_type}\r\n\r\nPNGDATA\r\n--XBOUNDARY--\r\n"
        );
        Request::builder()
            .method(Method::POST)
            .uri("/api/upload/avatar")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap()
    };

    let response = app.router.clone().oneshot(upload("image/png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["data"]["user"]["avatar_url"], "/uploads/0f/1e/0f1e.png");

    let response = app.router.clone().oneshot(upload("text/plain")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_and_metrics_are_exposed() {
    let app = app();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    app.call(Method::GET, "/api/games", None, None).await;
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();
    assert!(text.contains("questboard_http_requests_total"));
    assert!(text.contains("path=\"/health\""));
}
