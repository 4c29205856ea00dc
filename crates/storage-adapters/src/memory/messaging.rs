use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domains::{
    Conversation, ConversationKind, ConversationRepository, DomainError, DomainResult, Friendship, Message,
    MessageRepository, Page,
};
use uuid::Uuid;

use super::claim;

#[derive(Default)]
pub struct MemoryConversationRepo {
    conversations: DashMap<Uuid, Conversation>,
    /// Normalized user pair -> direct conversation id
    direct: DashMap<(Uuid, Uuid), Uuid>,
}

impl MemoryConversationRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationRepository for MemoryConversationRepo {
    async fn insert(&self, conversation: Conversation) -> DomainResult<Conversation> {
        if conversation.kind == ConversationKind::Direct {
            if let [a, b] = conversation.participants[..] {
                claim(&self.direct, Friendship::pair(a, b), conversation.id)
                    .map_err(|_| DomainError::conflict("a direct conversation already exists"))?;
            }
        }
        self.conversations.insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Conversation>> {
        Ok(self.conversations.get(&id).map(|c| c.value().clone()))
    }

    async fn find_direct(&self, a: Uuid, b: Uuid) -> DomainResult<Option<Conversation>> {
        let id = self.direct.get(&Friendship::pair(a, b)).map(|e| *e.value());
        Ok(id.and_then(|id| self.conversations.get(&id).map(|c| c.value().clone())))
    }

    async fn list_for_user(&self, user_id: Uuid) -> DomainResult<Vec<Conversation>> {
        let mut conversations: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|c| c.is_participant(user_id))
            .map(|c| c.value().clone())
            .collect();
        conversations.sort_by(|a, b| b.activity_at().cmp(&a.activity_at()));
        Ok(conversations)
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()> {
        let mut convo = self
            .conversations
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Conversation", id))?;
        convo.last_message_at = Some(at);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryMessageRepo {
    messages: DashMap<Uuid, Message>,
}

impl MemoryMessageRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(&self, conversation_id: Uuid) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .map(|m| m.value().clone())
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        messages
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepo {
    async fn insert(&self, message: Message) -> DomainResult<Message> {
        self.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn list(&self, conversation_id: Uuid, page: Page) -> DomainResult<Vec<Message>> {
        Ok(page.apply(self.newest_first(conversation_id)))
    }

    async fn last_message(&self, conversation_id: Uuid) -> DomainResult<Option<Message>> {
        Ok(self.newest_first(conversation_id).into_iter().next())
    }

    async fn count_unread(&self, conversation_id: Uuid, user_id: Uuid) -> DomainResult<u64> {
        Ok(self
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && m.is_unread_by(user_id))
            .count() as u64)
    }

    async fn mark_read(&self, conversation_id: Uuid, user_id: Uuid) -> DomainResult<u64> {
        let mut changed = 0;
        for mut m in self.messages.iter_mut() {
            if m.conversation_id == conversation_id && m.is_unread_by(user_id) {
                m.read_by.push(user_id);
                changed += 1;
            }
        }
        Ok(changed)
    }
}
