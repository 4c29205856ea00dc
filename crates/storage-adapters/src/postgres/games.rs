use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{DomainError, DomainResult, Game, GameFilter, GameRepository, Page};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{db_error, like_pattern, parse, push_page};

const COLUMNS: &str = "id, gm_id, title, description, system, platform, location, scheduled_at, duration_minutes, \
                       capacity, booked_seats, price_cents, currency, cancellation_policy, experience_level, tags, \
                       image_url, status, created_at, updated_at";

pub struct PgGameRepo {
    pool: PgPool,
}

impl PgGameRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct GameRow {
    id: Uuid,
    gm_id: Uuid,
    title: String,
    description: String,
    system: String,
    platform: String,
    location: Option<String>,
    scheduled_at: DateTime<Utc>,
    duration_minutes: i32,
    capacity: i32,
    booked_seats: i32,
    price_cents: i64,
    currency: String,
    cancellation_policy: String,
    experience_level: String,
    tags: Vec<String>,
    image_url: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GameRow> for Game {
    type Error = DomainError;

    fn try_from(row: GameRow) -> DomainResult<Self> {
        Ok(Game {
            id: row.id,
            gm_id: row.gm_id,
            title: row.title,
            description: row.description,
            system: row.system,
            platform: parse(&row.platform)?,
            location: row.location,
            scheduled_at: row.scheduled_at,
            duration_minutes: row.duration_minutes,
            capacity: row.capacity,
            booked_seats: row.booked_seats,
            price_cents: row.price_cents,
            currency: row.currency,
            cancellation_policy: parse(&row.cancellation_policy)?,
            experience_level: parse(&row.experience_level)?,
            tags: row.tags,
            image_url: row.image_url,
            status: parse(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &GameFilter) {
    qb.push(" WHERE TRUE");
    if let Some(system) = filter.system.clone() {
        qb.push(" AND lower(system) = lower(").push_bind(system).push(")");
    }
    if let Some(platform) = filter.platform {
        qb.push(" AND platform = ").push_bind(platform.as_str());
    }
    if let Some(gm_id) = filter.gm_id {
        qb.push(" AND gm_id = ").push_bind(gm_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = like_pattern(search);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(after) = filter.starts_after {
        qb.push(" AND scheduled_at > ").push_bind(after);
    }
    if filter.has_open_seats {
        qb.push(" AND booked_seats < capacity");
    }
}

fn one(row: Option<GameRow>) -> DomainResult<Option<Game>> {
    row.map(Game::try_from).transpose()
}

#[async_trait]
impl GameRepository for PgGameRepo {
    async fn insert(&self, game: Game) -> DomainResult<Game> {
        let row: GameRow = sqlx::query_as(&format!(
            "INSERT INTO games ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20) \
             RETURNING {COLUMNS}"
        ))
        .bind(game.id)
        .bind(game.gm_id)
        .bind(&game.title)
        .bind(&game.description)
        .bind(&game.system)
        .bind(game.platform.as_str())
        .bind(&game.location)
        .bind(game.scheduled_at)
        .bind(game.duration_minutes)
        .bind(game.capacity)
        .bind(game.booked_seats)
        .bind(game.price_cents)
        .bind(&game.currency)
        .bind(game.cancellation_policy.as_str())
        .bind(game.experience_level.as_str())
        .bind(&game.tags)
        .bind(&game.image_url)
        .bind(game.status.as_str())
        .bind(game.created_at)
        .bind(game.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Game>> {
        let row = sqlx::query_as::<_, GameRow>(&format!("SELECT {COLUMNS} FROM games WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        one(row)
    }

    async fn update(&self, game: Game) -> DomainResult<Game> {
        let row: Option<GameRow> = sqlx::query_as(&format!(
            "UPDATE games SET title = $2, description = $3, system = $4, platform = $5, location = $6, \
             scheduled_at = $7, duration_minutes = $8, capacity = $9, price_cents = $10, currency = $11, \
             cancellation_policy = $12, experience_level = $13, tags = $14, image_url = $15, status = $16, \
             updated_at = $17 \
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(game.id)
        .bind(&game.title)
        .bind(&game.description)
        .bind(&game.system)
        .bind(game.platform.as_str())
        .bind(&game.location)
        .bind(game.scheduled_at)
        .bind(game.duration_minutes)
        .bind(game.capacity)
        .bind(game.price_cents)
        .bind(&game.currency)
        .bind(game.cancellation_policy.as_str())
        .bind(game.experience_level.as_str())
        .bind(&game.tags)
        .bind(&game.image_url)
        .bind(game.status.as_str())
        .bind(game.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        one(row)?.ok_or_else(|| DomainError::not_found("Game", game.id))
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: GameFilter, page: Page) -> DomainResult<Vec<Game>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM games"));
        push_filter(&mut qb, &filter);
        qb.push(" ORDER BY scheduled_at, id");
        push_page(&mut qb, page);
        let rows = qb.build_query_as::<GameRow>().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.into_iter().map(Game::try_from).collect()
    }

    async fn count(&self, filter: GameFilter) -> DomainResult<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM games");
        push_filter(&mut qb, &filter);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await.map_err(db_error)?;
        Ok(count as u64)
    }

    /// A single conditional UPDATE, so concurrent bookings can never push
    /// `booked_seats` past `capacity`.
    async fn reserve_seats(&self, id: Uuid, seats: i32) -> DomainResult<Option<Game>> {
        let row = sqlx::query_as::<_, GameRow>(&format!(
            "UPDATE games SET booked_seats = booked_seats + $2, updated_at = now() \
             WHERE id = $1 AND status = 'scheduled' AND booked_seats + $2 <= capacity \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(seats)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match one(row)? {
            Some(game) => Ok(Some(game)),
            None => {
                let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM games WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_error)?;
                if exists {
                    Ok(None)
                } else {
                    Err(DomainError::not_found("Game", id))
                }
            }
        }
    }

    async fn release_seats(&self, id: Uuid, seats: i32) -> DomainResult<()> {
        sqlx::query(
            "UPDATE games SET booked_seats = GREATEST(booked_seats - $2, 0), updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(seats)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}
