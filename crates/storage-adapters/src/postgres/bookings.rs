use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{Booking, BookingRepository, DomainError, DomainResult, Page};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{db_error, parse};

const COLUMNS: &str = "id, game_id, player_id, seats, status, payment_status, payment_intent_id, total_cents, \
                       created_at, updated_at, cancelled_at";

pub struct PgBookingRepo {
    pool: PgPool,
}

impl PgBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    game_id: Uuid,
    player_id: Uuid,
    seats: i32,
    status: String,
    payment_status: String,
    payment_intent_id: Option<String>,
    total_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = DomainError;

    fn try_from(row: BookingRow) -> DomainResult<Self> {
        Ok(Booking {
            id: row.id,
            game_id: row.game_id,
            player_id: row.player_id,
            seats: row.seats,
            status: parse(&row.status)?,
            payment_status: parse(&row.payment_status)?,
            payment_intent_id: row.payment_intent_id,
            total_cents: row.total_cents,
            created_at: row.created_at,
            updated_at: row.updated_at,
            cancelled_at: row.cancelled_at,
        })
    }
}

fn many(rows: Vec<BookingRow>) -> DomainResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

#[async_trait]
impl BookingRepository for PgBookingRepo {
    async fn insert(&self, booking: Booking) -> DomainResult<Booking> {
        let row: BookingRow = sqlx::query_as(&format!(
            "INSERT INTO bookings ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        ))
        .bind(booking.id)
        .bind(booking.game_id)
        .bind(booking.player_id)
        .bind(booking.seats)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.payment_intent_id)
        .bind(booking.total_cents)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .bind(booking.cancelled_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!("SELECT {COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(Booking::try_from)
            .transpose()
    }

    async fn update(&self, booking: Booking) -> DomainResult<Booking> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "UPDATE bookings SET status = $2, payment_status = $3, payment_intent_id = $4, updated_at = $5, \
             cancelled_at = $6 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(booking.id)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.payment_intent_id)
        .bind(booking.updated_at)
        .bind(booking.cancelled_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.ok_or_else(|| DomainError::not_found("Booking", booking.id))?.try_into()
    }

    async fn list_by_player(&self, player_id: Uuid, page: Page) -> DomainResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {COLUMNS} FROM bookings WHERE player_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(player_id)
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        many(rows)
    }

    async fn list_by_game(&self, game_id: Uuid) -> DomainResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {COLUMNS} FROM bookings WHERE game_id = $1 ORDER BY created_at, id"
        ))
        .bind(game_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        many(rows)
    }

    async fn find_active(&self, game_id: Uuid, player_id: Uuid) -> DomainResult<Option<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {COLUMNS} FROM bookings WHERE game_id = $1 AND player_id = $2 AND status <> 'cancelled'"
        ))
        .bind(game_id)
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Booking::try_from)
        .transpose()
    }

    async fn count(&self) -> DomainResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(count as u64)
    }
}
