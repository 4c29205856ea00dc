use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{DomainError, DomainResult, Notification, NotificationFilter, NotificationRepository, Page};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{db_error, parse, push_page};

const COLUMNS: &str = "id, user_id, kind, category, priority, title, message, actor_id, related_id, link, is_read, \
                       read_at, created_at";

/// Rows per multi-row INSERT, well below Postgres' bind parameter limit.
const INSERT_CHUNK: usize = 1000;

pub struct PgNotificationRepo {
    pool: PgPool,
}

impl PgNotificationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    category: String,
    priority: String,
    title: String,
    message: String,
    actor_id: Option<Uuid>,
    related_id: Option<Uuid>,
    link: Option<String>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DomainError;

    fn try_from(row: NotificationRow) -> DomainResult<Self> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind: parse(&row.kind)?,
            category: parse(&row.category)?,
            priority: parse(&row.priority)?,
            title: row.title,
            message: row.message,
            actor_id: row.actor_id,
            related_id: row.related_id,
            link: row.link,
            is_read: row.is_read,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepo {
    async fn insert_many(&self, notifications: Vec<Notification>) -> DomainResult<u64> {
        if notifications.is_empty() {
            return Ok(0);
        }
        let mut inserted = 0;
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for chunk in notifications.chunks(INSERT_CHUNK) {
            let mut qb = QueryBuilder::<Postgres>::new(format!("INSERT INTO notifications ({COLUMNS}) "));
            qb.push_values(chunk, |mut b, n| {
                b.push_bind(n.id)
                    .push_bind(n.user_id)
                    .push_bind(n.kind.as_str())
                    .push_bind(n.category.as_str())
                    .push_bind(n.priority.as_str())
                    .push_bind(n.title.as_str())
                    .push_bind(n.message.as_str())
                    .push_bind(n.actor_id)
                    .push_bind(n.related_id)
                    .push_bind(n.link.as_deref())
                    .push_bind(n.is_read)
                    .push_bind(n.read_at)
                    .push_bind(n.created_at);
            });
            inserted += qb.build().execute(&mut *tx).await.map_err(db_error)?.rows_affected();
        }
        tx.commit().await.map_err(db_error)?;
        Ok(inserted)
    }

    async fn list(&self, user_id: Uuid, filter: NotificationFilter, page: Page) -> DomainResult<Vec<Notification>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM notifications WHERE user_id = "));
        qb.push_bind(user_id);
        if filter.unread_only {
            qb.push(" AND NOT is_read");
        }
        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category.as_str());
        }
        qb.push(" ORDER BY created_at DESC, id DESC");
        push_page(&mut qb, page);
        let rows = qb.build_query_as::<NotificationRow>().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn count_unread(&self, user_id: Uuid) -> DomainResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(count as u64)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> DomainResult<Option<Notification>> {
        sqlx::query_as::<_, NotificationRow>(&format!(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, now()) \
             WHERE id = $1 AND user_id = $2 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Notification::try_from)
        .transpose()
    }

    async fn mark_all_read(&self, user_id: Uuid) -> DomainResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = now() WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}
