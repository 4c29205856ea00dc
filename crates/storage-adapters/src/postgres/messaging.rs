use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    Conversation, ConversationKind, ConversationRepository, DomainError, DomainResult, Friendship, Message,
    MessageRepository, Page,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{db_error, parse};

const CONVERSATION_COLUMNS: &str = "id, kind, name, participants, created_by, last_message_at, created_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, recipient_id, content, read_by, created_at";

/// Canonical key for a direct pair, independent of argument order.
fn direct_key(a: Uuid, b: Uuid) -> String {
    let (low, high) = Friendship::pair(a, b);
    format!("{low}:{high}")
}

pub struct PgConversationRepo {
    pool: PgPool,
}

impl PgConversationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ConversationRow {
    id: Uuid,
    kind: String,
    name: Option<String>,
    participants: Vec<Uuid>,
    created_by: Uuid,
    last_message_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = DomainError;

    fn try_from(row: ConversationRow) -> DomainResult<Self> {
        Ok(Conversation {
            id: row.id,
            kind: parse(&row.kind)?,
            name: row.name,
            participants: row.participants,
            created_by: row.created_by,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ConversationRepository for PgConversationRepo {
    async fn insert(&self, conversation: Conversation) -> DomainResult<Conversation> {
        let key = match (conversation.kind, conversation.participants.as_slice()) {
            (ConversationKind::Direct, [a, b]) => Some(direct_key(*a, *b)),
            (ConversationKind::Direct, _) => {
                return Err(DomainError::validation("direct conversations have exactly two participants"))
            }
            (ConversationKind::Group, _) => None,
        };
        sqlx::query(
            "INSERT INTO conversations (id, kind, name, participants, created_by, direct_key, last_message_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(conversation.id)
        .bind(conversation.kind.as_str())
        .bind(&conversation.name)
        .bind(&conversation.participants)
        .bind(conversation.created_by)
        .bind(key)
        .bind(conversation.last_message_at)
        .bind(conversation.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(conversation)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Conversation>> {
        sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Conversation::try_from)
        .transpose()
    }

    async fn find_direct(&self, a: Uuid, b: Uuid) -> DomainResult<Option<Conversation>> {
        sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE direct_key = $1"
        ))
        .bind(direct_key(a, b))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Conversation::try_from)
        .transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> DomainResult<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE $1 = ANY(participants) \
             ORDER BY COALESCE(last_message_at, created_at) DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(Conversation::try_from).collect()
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE conversations SET last_message_at = GREATEST(COALESCE(last_message_at, $2), $2) WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Conversation", id));
        }
        Ok(())
    }
}

pub struct PgMessageRepo {
    pool: PgPool,
}

impl PgMessageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    recipient_id: Option<Uuid>,
    content: String,
    read_by: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            recipient_id: row.recipient_id,
            content: row.content,
            read_by: row.read_by,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepo {
    async fn insert(&self, message: Message) -> DomainResult<Message> {
        sqlx::query(&format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.recipient_id)
        .bind(&message.content)
        .bind(&message.read_by)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(message)
    }

    async fn list(&self, conversation_id: Uuid, page: Page) -> DomainResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(conversation_id)
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn last_message(&self, conversation_id: Uuid) -> DomainResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Message::from))
    }

    async fn count_unread(&self, conversation_id: Uuid, user_id: Uuid) -> DomainResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages \
             WHERE conversation_id = $1 AND sender_id <> $2 AND NOT ($2 = ANY(read_by))",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(count as u64)
    }

    async fn mark_read(&self, conversation_id: Uuid, user_id: Uuid) -> DomainResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read_by = array_append(read_by, $2) \
             WHERE conversation_id = $1 AND sender_id <> $2 AND NOT ($2 = ANY(read_by))",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_key_ignores_argument_order() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        assert_eq!(direct_key(a, b), direct_key(b, a));
    }
}
