use std::sync::Arc;

use chrono::{DateTime, Utc};
use domains::{
    Actor, BookingRepository, CancellationPolicy, DomainError, DomainResult, ExperienceLevel, Game, GameFilter,
    GameRepository, GameStatus, GameUpdate, NewGame, NewNotification, NotificationKind, Page, Platform,
    UserRepository,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::notifications::NotificationService;
use crate::{validate, Listing};

const MAX_TAGS: usize = 10;

/// Query-string filters for the public game listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameQuery {
    pub system: Option<String>,
    pub platform: Option<Platform>,
    pub gm_id: Option<Uuid>,
    pub search: Option<String>,
    /// Defaults to true: only games that have not started
    pub upcoming: Option<bool>,
    #[serde(default)]
    pub has_open_seats: bool,
    /// Defaults to `scheduled`
    pub status: Option<GameStatus>,
}

impl GameQuery {
    fn into_filter(self, now: DateTime<Utc>) -> GameFilter {
        GameFilter {
            system: self.system.filter(|s| !s.trim().is_empty()),
            platform: self.platform,
            gm_id: self.gm_id,
            status: Some(self.status.unwrap_or(GameStatus::Scheduled)),
            search: self.search.filter(|s| !s.trim().is_empty()),
            starts_after: self.upcoming.unwrap_or(true).then_some(now),
            has_open_seats: self.has_open_seats,
        }
    }
}

#[derive(Clone)]
pub struct GameService {
    games: Arc<dyn GameRepository>,
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserRepository>,
    notifier: NotificationService,
}

impl GameService {
    pub fn new(
        games: Arc<dyn GameRepository>,
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        notifier: NotificationService,
    ) -> Self {
        Self { games, bookings, users, notifier }
    }

    pub async fn list(&self, query: GameQuery, page: Page) -> DomainResult<Listing<Game>> {
        let filter = query.into_filter(Utc::now());
        let total = self.games.count(filter.clone()).await?;
        let items = self.games.list(filter, page).await?;
        Ok(Listing::new(items, total, page))
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<Game> {
        self.games.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("Game", id))
    }

    pub async fn list_mine(&self, actor: &Actor, page: Page) -> DomainResult<Listing<Game>> {
        let filter = GameFilter { gm_id: Some(actor.id), ..Default::default() };
        let total = self.games.count(filter.clone()).await?;
        let items = self.games.list(filter, page).await?;
        Ok(Listing::new(items, total, page))
    }

    pub async fn create(&self, actor: &Actor, input: NewGame) -> DomainResult<Game> {
        let mut gm = self
            .users
            .find_by_id(actor.id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", actor.id))?;
        if !gm.can_host() {
            return Err(DomainError::forbidden("only approved GMs can host games"));
        }

        let now = Utc::now();
        if input.scheduled_at <= now {
            return Err(DomainError::validation("a game must be scheduled in the future"));
        }
        check_capacity(input.capacity)?;
        check_duration(input.duration_minutes)?;
        check_price(input.price_cents)?;

        let currency = match input.currency {
            Some(c) => validate::text("currency", &c, 3)?.to_uppercase(),
            None => gm.pricing.as_ref().map_or_else(|| "USD".to_string(), |p| p.currency.clone()),
        };
        let game = Game {
            id: Uuid::now_v7(),
            gm_id: gm.id,
            title: validate::text("title", &input.title, 120)?,
            description: input.description.trim().chars().take(5000).collect(),
            system: validate::text("game system", &input.system, 60)?,
            platform: input.platform,
            location: validate::optional_text("location", input.location.as_deref(), 300)?,
            scheduled_at: input.scheduled_at,
            duration_minutes: input.duration_minutes,
            capacity: input.capacity,
            booked_seats: 0,
            price_cents: input.price_cents,
            currency,
            cancellation_policy: input.cancellation_policy.unwrap_or(CancellationPolicy::Moderate),
            experience_level: input.experience_level.unwrap_or(ExperienceLevel::All),
            tags: clean_tags(input.tags)?,
            image_url: input.image_url,
            status: GameStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        let game = self.games.insert(game).await?;
        tracing::info!(game_id = %game.id, gm_id = %gm.id, "game created");

        gm.stats.games_hosted += 1;
        gm.updated_at = now;
        if let Err(e) = self.users.update(gm).await {
            tracing::warn!(gm_id = %actor.id, error = %e, "failed to update hosted count");
        }
        Ok(game)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, update: GameUpdate) -> DomainResult<Game> {
        let mut game = self.owned(actor, id).await?;
        if game.status != GameStatus::Scheduled {
            return Err(DomainError::conflict("only scheduled games can be edited"));
        }
        if let Some(title) = update.title.as_deref() {
            game.title = validate::text("title", title, 120)?;
        }
        if let Some(description) = update.description {
            game.description = description.trim().chars().take(5000).collect();
        }
        if let Some(system) = update.system.as_deref() {
            game.system = validate::text("game system", system, 60)?;
        }
        if let Some(platform) = update.platform {
            game.platform = platform;
        }
        if let Some(location) = update.location.as_deref() {
            game.location = validate::optional_text("location", Some(location), 300)?;
        }
        if let Some(at) = update.scheduled_at {
            if at <= Utc::now() {
                return Err(DomainError::validation("a game must be scheduled in the future"));
            }
            game.scheduled_at = at;
        }
        if let Some(duration) = update.duration_minutes {
            check_duration(duration)?;
            game.duration_minutes = duration;
        }
        if let Some(capacity) = update.capacity {
            check_capacity(capacity)?;
            if capacity < game.booked_seats {
                return Err(DomainError::conflict(format!(
                    "capacity cannot drop below the {} seats already booked",
                    game.booked_seats
                )));
            }
            game.capacity = capacity;
        }
        if let Some(price) = update.price_cents {
            check_price(price)?;
            game.price_cents = price;
        }
        if let Some(policy) = update.cancellation_policy {
            game.cancellation_policy = policy;
        }
        if let Some(level) = update.experience_level {
            game.experience_level = level;
        }
        if let Some(tags) = update.tags {
            game.tags = clean_tags(tags)?;
        }
        if let Some(url) = update.image_url {
            game.image_url = Some(url);
        }
        game.updated_at = Utc::now();
        self.games.update(game).await
    }

    /// Cancels the game and every active booking on it, notifying each
    /// booked player.
    pub async fn cancel(&self, actor: &Actor, id: Uuid) -> DomainResult<Game> {
        let mut game = self.owned(actor, id).await?;
        if game.status != GameStatus::Scheduled {
            return Err(DomainError::conflict("game is not scheduled"));
        }
        game.status = GameStatus::Cancelled;
        game.updated_at = Utc::now();
        let game = self.games.update(game).await?;

        let players = self.void_bookings(game.id).await?;
        let note = NewNotification::new(
            NotificationKind::GameCancelled,
            "Game cancelled",
            format!("\"{}\" has been cancelled by the GM", game.title),
        )
        .actor(actor.id)
        .related(game.id)
        .link("/bookings");
        self.notifier.fan_out(players, &note).await;
        tracing::info!(game_id = %game.id, "game cancelled");
        Ok(game)
    }

    /// Cancels every active booking on a game, refunding paid ones since the
    /// player is not at fault. Returns the affected players.
    pub(crate) async fn void_bookings(&self, game_id: Uuid) -> DomainResult<Vec<Uuid>> {
        let mut players = Vec::new();
        for mut booking in self.bookings.list_by_game(game_id).await? {
            if !booking.is_active() {
                continue;
            }
            booking.cancel(true);
            let booking = self.bookings.update(booking).await?;
            players.push(booking.player_id);
        }
        Ok(players)
    }

    async fn owned(&self, actor: &Actor, id: Uuid) -> DomainResult<Game> {
        let game = self.get(id).await?;
        if game.gm_id != actor.id && !actor.is_admin() {
            return Err(DomainError::forbidden("only the hosting GM can manage this game"));
        }
        Ok(game)
    }
}

fn check_capacity(capacity: i32) -> DomainResult<()> {
    if (1..=Game::MAX_CAPACITY).contains(&capacity) {
        Ok(())
    } else {
        Err(DomainError::validation(format!("capacity must be between 1 and {}", Game::MAX_CAPACITY)))
    }
}

fn check_duration(minutes: i32) -> DomainResult<()> {
    if minutes > 0 && minutes <= 24 * 60 {
        Ok(())
    } else {
        Err(DomainError::validation("duration must be between 1 minute and 24 hours"))
    }
}

fn check_price(cents: i64) -> DomainResult<()> {
    if cents >= 0 {
        Ok(())
    } else {
        Err(DomainError::validation("price cannot be negative"))
    }
}

fn clean_tags(tags: Vec<String>) -> DomainResult<Vec<String>> {
    let mut cleaned: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    if cleaned.len() > MAX_TAGS {
        return Err(DomainError::validation(format!("at most {MAX_TAGS} tags")));
    }
    Ok(cleaned)
}
