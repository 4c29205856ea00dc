//! Seeds a Postgres database with an admin account, a demo GM and a few
//! upcoming games. Safe to run repeatedly: existing accounts are reused and
//! games are only created for a GM with none.
//!
//! `SEED_PASSWORD` sets the password of both accounts; `SEED_ADMIN_EMAIL`
//! overrides the admin address.

use std::sync::Arc;

use anyhow::{bail, Context};
use auth_adapters::{Argon2PasswordHasher, JwtTokenIssuer, RandomCodeGenerator};
use chrono::{Duration, Utc};
use configs::Settings;
use domains::{
    Actor, ApplicationStatus, CancellationPolicy, ExperienceLevel, GameFilter, GameRepository, GmPricing, NewGame,
    Platform, Role, User, UserRepository,
};
use secrecy::ExposeSecret;
use services::{AppServices, Ports, RegisterInput, ServiceOptions};
use storage_adapters::media::LocalMediaStorage;
use storage_adapters::postgres::{self, *};
use tracing_subscriber::EnvFilter;

struct Account<'a> {
    username: &'a str,
    email: &'a str,
    display_name: &'a str,
    role: Role,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if !settings.database.is_configured() {
        bail!("set QUESTBOARD__DATABASE__URL to the database to seed");
    }
    let password = std::env::var("SEED_PASSWORD").context("SEED_PASSWORD is required")?;
    let admin_email = std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@questboard.local".into());

    let pool = postgres::connect(settings.database.url.expose_secret(), 2)
        .await
        .context("connecting to postgres")?;
    postgres::migrate(&pool).await.context("running migrations")?;

    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepo::new(pool.clone()));
    let ports = Ports {
        users: users.clone(),
        games: Arc::new(PgGameRepo::new(pool.clone())),
        bookings: Arc::new(PgBookingRepo::new(pool.clone())),
        reviews: Arc::new(PgReviewRepo::new(pool.clone())),
        conversations: Arc::new(PgConversationRepo::new(pool.clone())),
        messages: Arc::new(PgMessageRepo::new(pool.clone())),
        friends: Arc::new(PgFriendRepo::new(pool.clone())),
        notifications: Arc::new(PgNotificationRepo::new(pool.clone())),
        favorites: Arc::new(PgFavoriteRepo::new(pool)),
        hasher: Arc::new(Argon2PasswordHasher::new()),
        tokens: Arc::new(JwtTokenIssuer::new(
            settings.auth.jwt_secret.expose_secret().as_bytes(),
            settings.auth.token_ttl_hours,
        )),
        codes: Arc::new(RandomCodeGenerator::default()),
        media: Arc::new(LocalMediaStorage::new(settings.media.root.clone(), settings.media.url_prefix.clone())),
    };
    let games = ports.games.clone();
    let services = AppServices::new(ports, ServiceOptions { max_upload_bytes: settings.media.max_upload_bytes });

    let admin = Account { username: "admin", email: &admin_email, display_name: "Questboard Admin", role: Role::Admin };
    ensure_account(&services, users.as_ref(), &admin, &password).await?;

    let gm_account = Account {
        username: "demo_gm",
        email: "gm@questboard.local",
        display_name: "Demo Game Master",
        role: Role::Gm,
    };
    let gm = ensure_account(&services, users.as_ref(), &gm_account, &password).await?;

    let hosted = games.count(GameFilter { gm_id: Some(gm.id), ..Default::default() }).await?;
    if hosted > 0 {
        tracing::info!(hosted, "demo GM already hosts games, skipping");
        return Ok(());
    }
    let actor = Actor::new(gm.id, gm.role);
    for input in demo_games() {
        let game = services.games.create(&actor, input).await?;
        tracing::info!(game_id = %game.id, title = %game.title, "seeded game");
    }
    Ok(())
}

/// Registers the account unless its email exists, then applies the role.
async fn ensure_account(
    services: &AppServices,
    users: &dyn UserRepository,
    account: &Account<'_>,
    password: &str,
) -> anyhow::Result<User> {
    let mut user = match users.find_by_email(account.email).await? {
        Some(user) => {
            tracing::info!(email = account.email, "account exists");
            user
        }
        None => {
            let session = services
                .auth
                .register(RegisterInput {
                    username: account.username.into(),
                    email: account.email.into(),
                    password: password.into(),
                    display_name: Some(account.display_name.into()),
                    referral_code: None,
                })
                .await
                .with_context(|| format!("registering {}", account.email))?;
            users
                .find_by_id(session.user.id)
                .await?
                .context("registered account vanished")?
        }
    };

    if user.role != account.role {
        user.role = account.role;
        if account.role == Role::Gm {
            user.gm_application.status = ApplicationStatus::Approved;
            user.gm_application.systems = vec!["D&D 5e".into(), "Call of Cthulhu".into()];
            user.gm_application.reviewed_at = Some(Utc::now());
            user.pricing = Some(GmPricing { per_session_cents: 1500, currency: "USD".into() });
        }
        user.updated_at = Utc::now();
        user = users.update(user).await?;
        tracing::info!(email = account.email, role = %account.role, "role applied");
    }
    Ok(user)
}

fn demo_games() -> Vec<NewGame> {
    let game = |title: &str, system: &str, days: i64, capacity: i32, price_cents: i64| NewGame {
        title: title.into(),
        description: format!("A {system} session for new and returning players."),
        system: system.into(),
        platform: Platform::Online,
        location: None,
        scheduled_at: Utc::now() + Duration::days(days),
        duration_minutes: 240,
        capacity,
        price_cents,
        currency: Some("USD".into()),
        cancellation_policy: Some(CancellationPolicy::Flexible),
        experience_level: Some(ExperienceLevel::All),
        tags: vec!["one-shot".into()],
        image_url: None,
    };
    vec![
        game("Lost Mine of Phandelver", "D&D 5e", 3, 5, 0),
        game("The Haunting", "Call of Cthulhu", 7, 4, 1500),
        game("Curse of Strahd: Session Zero", "D&D 5e", 14, 6, 1000),
    ]
}
