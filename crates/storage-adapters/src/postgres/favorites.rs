use async_trait::async_trait;
use domains::{DomainResult, Favorite, FavoriteRepository};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::db_error;

pub struct PgFavoriteRepo {
    pool: PgPool,
}

impl PgFavoriteRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct FavoriteRow {
    id: Uuid,
    user_id: Uuid,
    gm_id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<FavoriteRow> for Favorite {
    fn from(row: FavoriteRow) -> Self {
        Favorite { id: row.id, user_id: row.user_id, gm_id: row.gm_id, created_at: row.created_at }
    }
}

#[async_trait]
impl FavoriteRepository for PgFavoriteRepo {
    async fn insert(&self, favorite: Favorite) -> DomainResult<Favorite> {
        sqlx::query("INSERT INTO favorites (id, user_id, gm_id, created_at) VALUES ($1, $2, $3, $4)")
            .bind(favorite.id)
            .bind(favorite.user_id)
            .bind(favorite.gm_id)
            .bind(favorite.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(favorite)
    }

    async fn delete(&self, user_id: Uuid, gm_id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND gm_id = $2")
            .bind(user_id)
            .bind(gm_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_user(&self, user_id: Uuid) -> DomainResult<Vec<Favorite>> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            "SELECT id, user_id, gm_id, created_at FROM favorites WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Favorite::from).collect())
    }
}
