use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{DomainError, DomainResult, FriendRepository, FriendRequest, Friendship};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{db_error, parse};

const REQUEST_COLUMNS: &str = "id, sender_id, recipient_id, status, note, created_at, responded_at";
const FRIENDSHIP_COLUMNS: &str = "id, user_a, user_b, created_at";

pub struct PgFriendRepo {
    pool: PgPool,
}

impl PgFriendRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn requests_where(&self, clause: &str, user_id: Uuid) -> DomainResult<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE {clause} AND status = 'pending' \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(FriendRequest::try_from).collect()
    }
}

#[derive(FromRow)]
struct RequestRow {
    id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    status: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
}

impl TryFrom<RequestRow> for FriendRequest {
    type Error = DomainError;

    fn try_from(row: RequestRow) -> DomainResult<Self> {
        Ok(FriendRequest {
            id: row.id,
            sender_id: row.sender_id,
            recipient_id: row.recipient_id,
            status: parse(&row.status)?,
            note: row.note,
            created_at: row.created_at,
            responded_at: row.responded_at,
        })
    }
}

#[derive(FromRow)]
struct FriendshipRow {
    id: Uuid,
    user_a: Uuid,
    user_b: Uuid,
    created_at: DateTime<Utc>,
}

impl From<FriendshipRow> for Friendship {
    fn from(row: FriendshipRow) -> Self {
        Friendship { id: row.id, user_a: row.user_a, user_b: row.user_b, created_at: row.created_at }
    }
}

#[async_trait]
impl FriendRepository for PgFriendRepo {
    async fn insert_request(&self, request: FriendRequest) -> DomainResult<FriendRequest> {
        sqlx::query(&format!(
            "INSERT INTO friend_requests ({REQUEST_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(request.id)
        .bind(request.sender_id)
        .bind(request.recipient_id)
        .bind(request.status.as_str())
        .bind(&request.note)
        .bind(request.created_at)
        .bind(request.responded_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(request)
    }

    async fn find_request(&self, id: Uuid) -> DomainResult<Option<FriendRequest>> {
        sqlx::query_as::<_, RequestRow>(&format!("SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(FriendRequest::try_from)
            .transpose()
    }

    async fn requests_between(&self, a: Uuid, b: Uuid) -> DomainResult<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM friend_requests \
             WHERE (sender_id = $1 AND recipient_id = $2) OR (sender_id = $2 AND recipient_id = $1)"
        ))
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(FriendRequest::try_from).collect()
    }

    async fn update_request(&self, request: FriendRequest) -> DomainResult<FriendRequest> {
        let result = sqlx::query("UPDATE friend_requests SET status = $2, note = $3, responded_at = $4 WHERE id = $1")
            .bind(request.id)
            .bind(request.status.as_str())
            .bind(&request.note)
            .bind(request.responded_at)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("FriendRequest", request.id));
        }
        Ok(request)
    }

    async fn delete_request(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM friend_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_requests_between(&self, a: Uuid, b: Uuid) -> DomainResult<u64> {
        let result = sqlx::query(
            "DELETE FROM friend_requests \
             WHERE (sender_id = $1 AND recipient_id = $2) OR (sender_id = $2 AND recipient_id = $1)",
        )
        .bind(a)
        .bind(b)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    async fn list_incoming(&self, user_id: Uuid) -> DomainResult<Vec<FriendRequest>> {
        self.requests_where("recipient_id = $1", user_id).await
    }

    async fn list_outgoing(&self, user_id: Uuid) -> DomainResult<Vec<FriendRequest>> {
        self.requests_where("sender_id = $1", user_id).await
    }

    async fn insert_friendship(&self, friendship: Friendship) -> DomainResult<Friendship> {
        let (user_a, user_b) = Friendship::pair(friendship.user_a, friendship.user_b);
        sqlx::query(&format!("INSERT INTO friendships ({FRIENDSHIP_COLUMNS}) VALUES ($1, $2, $3, $4)"))
            .bind(friendship.id)
            .bind(user_a)
            .bind(user_b)
            .bind(friendship.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(Friendship { user_a, user_b, ..friendship })
    }

    async fn find_friendship(&self, a: Uuid, b: Uuid) -> DomainResult<Option<Friendship>> {
        let (user_a, user_b) = Friendship::pair(a, b);
        let row = sqlx::query_as::<_, FriendshipRow>(&format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships WHERE user_a = $1 AND user_b = $2"
        ))
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Friendship::from))
    }

    async fn delete_friendship(&self, a: Uuid, b: Uuid) -> DomainResult<bool> {
        let (user_a, user_b) = Friendship::pair(a, b);
        let result = sqlx::query("DELETE FROM friendships WHERE user_a = $1 AND user_b = $2")
            .bind(user_a)
            .bind(user_b)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_friendships(&self, user_id: Uuid) -> DomainResult<Vec<Friendship>> {
        let rows = sqlx::query_as::<_, FriendshipRow>(&format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships WHERE user_a = $1 OR user_b = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Friendship::from).collect())
    }
}
