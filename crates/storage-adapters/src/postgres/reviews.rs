use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{DomainError, DomainResult, Page, RatingSummary, Review, ReviewRepository};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::db_error;

const COLUMNS: &str = "id, game_id, gm_id, player_id, rating, comment, created_at";

pub struct PgReviewRepo {
    pool: PgPool,
}

impl PgReviewRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ReviewRow {
    id: Uuid,
    game_id: Uuid,
    gm_id: Uuid,
    player_id: Uuid,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = DomainError;

    fn try_from(row: ReviewRow) -> DomainResult<Self> {
        let rating = u8::try_from(row.rating)
            .map_err(|_| DomainError::internal(format!("stored rating {} out of range", row.rating)))?;
        Ok(Review {
            id: row.id,
            game_id: row.game_id,
            gm_id: row.gm_id,
            player_id: row.player_id,
            rating,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

fn many(rows: Vec<ReviewRow>) -> DomainResult<Vec<Review>> {
    rows.into_iter().map(Review::try_from).collect()
}

#[async_trait]
impl ReviewRepository for PgReviewRepo {
    async fn insert(&self, review: Review) -> DomainResult<Review> {
        let row: ReviewRow = sqlx::query_as(&format!(
            "INSERT INTO reviews ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
        ))
        .bind(review.id)
        .bind(review.game_id)
        .bind(review.gm_id)
        .bind(review.player_id)
        .bind(i16::from(review.rating))
        .bind(&review.comment)
        .bind(review.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        row.try_into()
    }

    async fn list_by_game(&self, game_id: Uuid) -> DomainResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {COLUMNS} FROM reviews WHERE game_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(game_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        many(rows)
    }

    async fn list_by_gm(&self, gm_id: Uuid, page: Page) -> DomainResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {COLUMNS} FROM reviews WHERE gm_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(gm_id)
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        many(rows)
    }

    async fn rating_summary(&self, gm_id: Uuid) -> DomainResult<RatingSummary> {
        let (count, average): (i32, f64) = sqlx::query_as(
            "SELECT COUNT(*)::INT4, COALESCE(AVG(rating), 0)::FLOAT8 FROM reviews WHERE gm_id = $1",
        )
        .bind(gm_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(RatingSummary { count, average })
    }
}
