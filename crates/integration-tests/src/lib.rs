//! Shared fixtures for the cross-crate tests: a fully wired router over
//! in-memory adapters, plus `fake`-generated users and games.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use api_adapters::{router, ApiOptions, AppState};
use auth_adapters::{JwtTokenIssuer, RandomCodeGenerator};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration as ChronoDuration, Utc};
use domains::{MockMediaStorage, MockPasswordHasher, Role, StoredMedia, UserRepository};
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;
use serde_json::{json, Value};
use services::{AppServices, Ports, ServiceOptions};
use storage_adapters::{
    MemoryBookingRepo, MemoryConversationRepo, MemoryFavoriteRepo, MemoryFriendRepo, MemoryGameRepo,
    MemoryMessageRepo, MemoryNotificationRepo, MemoryRateLimiter, MemoryReviewRepo, MemoryUserRepo,
};
use tower::ServiceExt;
use uuid::Uuid;

pub use serde_json;

static NEXT_USER: AtomicU32 = AtomicU32::new(1);

/// Memory-backed ports with a cheap password hasher and a stub media store.
pub fn memory_ports() -> Ports {
    let mut hasher = MockPasswordHasher::new();
    hasher.expect_hash().returning(|p| Ok(format!("plain:{p}")));
    hasher.expect_verify().returning(|p, h| h == format!("plain:{p}"));

    let mut media = MockMediaStorage::new();
    media.expect_store().returning(|data, content_type| {
        Ok(StoredMedia {
            key: "c0ffee.png".into(),
            url: "/uploads/c0/ff/c0ffee.png".into(),
            thumbnail_url: None,
            content_type: content_type.to_string(),
            size: data.len() as u64,
        })
    });

    Ports {
        users: Arc::new(MemoryUserRepo::new()),
        games: Arc::new(MemoryGameRepo::new()),
        bookings: Arc::new(MemoryBookingRepo::new()),
        reviews: Arc::new(MemoryReviewRepo::new()),
        conversations: Arc::new(MemoryConversationRepo::new()),
        messages: Arc::new(MemoryMessageRepo::new()),
        friends: Arc::new(MemoryFriendRepo::new()),
        notifications: Arc::new(MemoryNotificationRepo::new()),
        favorites: Arc::new(MemoryFavoriteRepo::new()),
        hasher: Arc::new(hasher),
        tokens: Arc::new(JwtTokenIssuer::new(b"integration-secret-integration-secret", 1)),
        codes: Arc::new(RandomCodeGenerator::default()),
        media: Arc::new(media),
    }
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
    pub username: String,
}

#[derive(Clone)]
pub struct TestApp {
    pub router: Router,
    pub ports: Ports,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let ports = memory_ports();
        let services = AppServices::new(ports.clone(), ServiceOptions::default());
        let limiter = Arc::new(MemoryRateLimiter::new(10_000, Duration::from_secs(60)));
        let router = router(AppState::new(services, limiter), &ApiOptions::default());
        Self { router, ports }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");
        let response = self.router.clone().oneshot(request).await.expect("infallible router");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("readable body");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(&user.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser, body: Option<Value>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(&user.token), body).await
    }

    /// Registers a player with a generated display name.
    pub async fn signup(&self) -> TestUser {
        let n = NEXT_USER.fetch_add(1, Ordering::Relaxed);
        let username = format!("player_{n}");
        let display_name: String = Name().fake();
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "correct-horse-battery",
                    "display_name": display_name,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        TestUser {
            id: body["data"]["user"]["id"].as_str().and_then(|s| s.parse().ok()).expect("user id"),
            token: body["data"]["token"].as_str().expect("token").to_string(),
            username,
        }
    }

    /// Registers a user and promotes them directly in the store. Tokens
    /// carry no authority of their own, so the existing token now acts with
    /// the new role.
    pub async fn signup_as(&self, role: Role) -> TestUser {
        let user = self.signup().await;
        let mut stored = self.ports.users.find_by_id(user.id).await.unwrap().expect("stored user");
        stored.role = role;
        self.ports.users.update(stored).await.unwrap();
        user
    }

    /// Creates a game through the API, starting in two days.
    pub async fn host_game(&self, gm: &TestUser, capacity: i32, price_cents: i64) -> Value {
        let (status, body) = self.post("/api/games", gm, game_input(capacity, price_cents)).await;
        assert_eq!(status, StatusCode::CREATED, "create game failed: {body}");
        body["data"].clone()
    }

    pub async fn notification_kinds(&self, user: &TestUser) -> Vec<String> {
        let (_, body) = self.get("/api/messages/notifications?limit=100", user).await;
        body["data"]
            .as_array()
            .map(|items| items.iter().filter_map(|n| n["kind"].as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

/// A valid game payload with generated text.
pub fn game_input(capacity: i32, price_cents: i64) -> Value {
    let title: String = Sentence(2..5).fake();
    let description: String = Sentence(6..12).fake();
    json!({
        "title": title,
        "description": description,
        "system": "D&D 5e",
        "platform": "online",
        "scheduled_at": Utc::now() + ChronoDuration::days(2),
        "duration_minutes": 180,
        "capacity": capacity,
        "price_cents": price_cents,
        "cancellation_policy": "flexible",
        "tags": ["one-shot", "beginner friendly"],
    })
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("id field").to_string()
}
