//! Wiring for service unit tests: in-memory repositories plus mockall
//! doubles for the crypto and media ports.

use std::sync::Arc;

use chrono::{Duration, Utc};
use domains::{
    Actor, CancellationPolicy, DomainError, ExperienceLevel, Game, GameStatus, IssuedToken, MockCodeGenerator,
    MockMediaStorage, MockPasswordHasher, MockTokenIssuer, Platform, Role, StoredMedia, TokenClaims, User,
    UserRepository,
};
use storage_adapters::{
    MemoryBookingRepo, MemoryConversationRepo, MemoryFavoriteRepo, MemoryFriendRepo, MemoryGameRepo,
    MemoryMessageRepo, MemoryNotificationRepo, MemoryReviewRepo, MemoryUserRepo,
};
use uuid::Uuid;

use crate::{AppServices, Ports, ServiceOptions};

pub fn hasher() -> MockPasswordHasher {
    let mut hasher = MockPasswordHasher::new();
    hasher.expect_hash().returning(|p| Ok(format!("hashed:{p}")));
    hasher.expect_verify().returning(|p, h| h == format!("hashed:{p}"));
    hasher
}

/// Tokens are the user id itself, so `verify` can recover it.
pub fn tokens() -> MockTokenIssuer {
    let mut tokens = MockTokenIssuer::new();
    tokens.expect_issue().returning(|id, _| {
        Ok(IssuedToken { token: id.to_string(), expires_at: Utc::now() + Duration::hours(1) })
    });
    tokens.expect_verify().returning(|token| {
        let sub = token
            .parse::<Uuid>()
            .map_err(|_| DomainError::Unauthorized("invalid token".into()))?;
        Ok(TokenClaims { sub, role: Role::Player, exp: 0, iat: 0 })
    });
    tokens
}

pub fn codes() -> MockCodeGenerator {
    let mut codes = MockCodeGenerator::new();
    let mut n = 0u32;
    codes.expect_referral_code().returning(move || {
        n += 1;
        format!("CODE{n:04}")
    });
    codes
}

pub fn media() -> MockMediaStorage {
    let mut media = MockMediaStorage::new();
    media.expect_store().returning(|data, content_type| {
        Ok(StoredMedia {
            key: "ab/cd/abcd.png".into(),
            url: "/uploads/ab/cd/abcd.png".into(),
            thumbnail_url: None,
            content_type: content_type.to_string(),
            size: data.len() as u64,
        })
    });
    media
}

pub fn ports() -> Ports {
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
        hasher: Arc::new(hasher()),
        tokens: Arc::new(tokens()),
        codes: Arc::new(codes()),
        media: Arc::new(media()),
    }
}

pub struct Harness {
    pub ports: Ports,
    pub services: AppServices,
}

impl Harness {
    pub fn new() -> Self {
        let ports = ports();
        let services = AppServices::new(ports.clone(), ServiceOptions { max_upload_bytes: 1024 });
        Self { ports, services }
    }

    /// Stores a user with the given role and returns its actor.
    pub async fn user(&self, name: &str, role: Role) -> Actor {
        let mut user = User::new(
            name.into(),
            format!("{name}@example.com"),
            "hashed:password123".into(),
            name.into(),
            format!("REF-{name}"),
        );
        user.role = role;
        let user = self.ports.users.insert(user).await.unwrap();
        Actor::new(user.id, user.role)
    }

    pub async fn load(&self, id: Uuid) -> User {
        self.ports.users.find_by_id(id).await.unwrap().unwrap()
    }

    /// Stores a scheduled game starting in `hours_ahead` hours.
    pub async fn game(&self, gm: &Actor, capacity: i32, price_cents: i64, hours_ahead: i64) -> Game {
        let now = Utc::now();
        let game = Game {
            id: Uuid::now_v7(),
            gm_id: gm.id,
            title: "Lost Mine of Phandelver".into(),
            description: "Starter adventure".into(),
            system: "D&D 5e".into(),
            platform: Platform::Online,
            location: None,
            scheduled_at: now + Duration::hours(hours_ahead),
            duration_minutes: 180,
            capacity,
            booked_seats: 0,
            price_cents,
            currency: "USD".into(),
            cancellation_policy: CancellationPolicy::Flexible,
            experience_level: ExperienceLevel::All,
            tags: vec![],
            image_url: None,
            status: GameStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        self.ports.games.insert(game).await.unwrap()
    }
}
