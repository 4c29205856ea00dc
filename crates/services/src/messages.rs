use std::collections::BTreeSet;
use std::sync::Arc;

use domains::{
    Actor, Conversation, ConversationRepository, ConversationSummary, DomainError, DomainResult, Message,
    MessageRepository, NewNotification, NotificationKind, Page, UserRepository,
};
use uuid::Uuid;

use crate::notifications::NotificationService;
use crate::validate;

const MAX_GROUP_SIZE: usize = 50;
const PREVIEW_LEN: usize = 100;

#[derive(Clone)]
pub struct MessageService {
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    users: Arc<dyn UserRepository>,
    notifier: NotificationService,
}

impl MessageService {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        messages: Arc<dyn MessageRepository>,
        users: Arc<dyn UserRepository>,
        notifier: NotificationService,
    ) -> Self {
        Self { conversations, messages, users, notifier }
    }

    pub async fn list_conversations(&self, actor: &Actor) -> DomainResult<Vec<ConversationSummary>> {
        let conversations = self.conversations.list_for_user(actor.id).await?;
        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let last_message = self.messages.last_message(conversation.id).await?;
            let unread_count = self.messages.count_unread(conversation.id, actor.id).await?;
            summaries.push(ConversationSummary { conversation, last_message, unread_count });
        }
        Ok(summaries)
    }

    /// One other participant opens (or reuses) a direct conversation; more
    /// make a named group.
    pub async fn start(&self, actor: &Actor, participants: Vec<Uuid>, name: Option<String>) -> DomainResult<Conversation> {
        let others: BTreeSet<Uuid> = participants.into_iter().filter(|id| *id != actor.id).collect();
        if others.is_empty() {
            return Err(DomainError::validation("a conversation needs at least one other participant"));
        }
        if others.len() >= MAX_GROUP_SIZE {
            return Err(DomainError::validation(format!("groups are limited to {MAX_GROUP_SIZE} participants")));
        }
        let ids: Vec<Uuid> = others.iter().copied().collect();
        let found = self.users.find_many(ids.clone()).await?;
        if let Some(missing) = ids.iter().find(|id| !found.iter().any(|u| u.id == **id && u.is_active)) {
            return Err(DomainError::not_found("User", missing));
        }

        if let [other] = ids.as_slice() {
            if let Some(existing) = self.conversations.find_direct(actor.id, *other).await? {
                return Ok(existing);
            }
            return match self.conversations.insert(Conversation::direct(actor.id, *other)).await {
                Ok(c) => Ok(c),
                // Lost a race with the other participant opening the same pair.
                Err(DomainError::Conflict(_)) => self
                    .conversations
                    .find_direct(actor.id, *other)
                    .await?
                    .ok_or_else(|| DomainError::internal("direct conversation vanished")),
                Err(e) => Err(e),
            };
        }

        let name = validate::text("group name", name.as_deref().unwrap_or_default(), 100)?;
        let conversation = self.conversations.insert(Conversation::group(name, actor.id, ids)).await?;
        tracing::info!(conversation_id = %conversation.id, size = conversation.participants.len(), "group created");
        Ok(conversation)
    }

    /// The conversation, if the caller takes part in it.
    pub async fn conversation(&self, actor: &Actor, id: Uuid) -> DomainResult<Conversation> {
        let conversation = self
            .conversations
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Conversation", id))?;
        if !conversation.is_participant(actor.id) {
            return Err(DomainError::forbidden("you are not part of this conversation"));
        }
        Ok(conversation)
    }

    pub async fn list_messages(&self, actor: &Actor, id: Uuid, page: Page) -> DomainResult<Vec<Message>> {
        self.conversation(actor, id).await?;
        self.messages.list(id, page).await
    }

    /// Stores the message and notifies the other participants. Returns the
    /// conversation too so callers can relay to its room.
    pub async fn send(&self, actor: &Actor, id: Uuid, content: &str) -> DomainResult<(Conversation, Message)> {
        let conversation = self.conversation(actor, id).await?;
        let content = validate::text("message", content, Message::MAX_LEN)?;
        let message = self.messages.insert(Message::new(&conversation, actor.id, content)).await?;
        self.conversations.touch(conversation.id, message.created_at).await?;

        let sender = self.users.find_by_id(actor.id).await?;
        let title = match (&sender, &conversation.name) {
            (Some(s), Some(group)) => format!("{} in {group}", s.display_name),
            (Some(s), None) => format!("New message from {}", s.display_name),
            (None, _) => "New message".to_string(),
        };
        let preview: String = message.content.chars().take(PREVIEW_LEN).collect();
        let note = NewNotification::new(NotificationKind::NewMessage, title, preview)
            .actor(actor.id)
            .related(conversation.id)
            .link(format!("/messages/{}", conversation.id));
        self.notifier.fan_out(conversation.others(actor.id), &note).await;

        Ok((conversation, message))
    }

    pub async fn mark_read(&self, actor: &Actor, id: Uuid) -> DomainResult<u64> {
        self.conversation(actor, id).await?;
        self.messages.mark_read(id, actor.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use domains::{ConversationKind, NotificationFilter, Role};

    #[tokio::test]
    async fn direct_conversation_is_reused_from_either_side() {
        let h = Harness::new();
        let kate = h.user("kate", Role::Player).await;
        let ben = h.user("ben", Role::Player).await;

        let first = h.services.messages.start(&kate, vec![ben.id], None).await.unwrap();
        let second = h.services.messages.start(&ben, vec![kate.id, ben.id], None).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.kind, ConversationKind::Direct);
    }

    #[tokio::test]
    async fn groups_need_a_name_and_existing_members() {
        let h = Harness::new();
        let kate = h.user("kate", Role::Player).await;
        let ben = h.user("ben", Role::Player).await;
        let cara = h.user("cara", Role::Player).await;

        let unnamed = h.services.messages.start(&kate, vec![ben.id, cara.id], None).await;
        assert!(matches!(unnamed, Err(DomainError::Validation(_))));
        let ghost = h.services.messages.start(&kate, vec![ben.id, Uuid::now_v7()], Some("Party".into())).await;
        assert!(matches!(ghost, Err(DomainError::NotFound { .. })));

        let group = h.services.messages.start(&kate, vec![ben.id, cara.id], Some("Party".into())).await.unwrap();
        assert_eq!(group.participants.len(), 3);
    }

    #[tokio::test]
    async fn only_participants_read_or_send() {
        let h = Harness::new();
        let kate = h.user("kate", Role::Player).await;
        let ben = h.user("ben", Role::Player).await;
        let eve = h.user("eve", Role::Player).await;
        let convo = h.services.messages.start(&kate, vec![ben.id], None).await.unwrap();

        let read = h.services.messages.list_messages(&eve, convo.id, Page::default()).await;
        assert!(matches!(read, Err(DomainError::Forbidden(_))));
        let send = h.services.messages.send(&eve, convo.id, "hi").await;
        assert!(matches!(send, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn send_notifies_others_and_tracks_unread() {
        let h = Harness::new();
        let kate = h.user("kate", Role::Player).await;
        let ben = h.user("ben", Role::Player).await;
        let convo = h.services.messages.start(&kate, vec![ben.id], None).await.unwrap();

        let empty = h.services.messages.send(&kate, convo.id, "   ").await;
        assert!(matches!(empty, Err(DomainError::Validation(_))));
        let long = "x".repeat(Message::MAX_LEN + 1);
        assert!(h.services.messages.send(&kate, convo.id, &long).await.is_err());

        h.services.messages.send(&kate, convo.id, "  Session zero on Friday?  ").await.unwrap();
        h.services.messages.send(&kate, convo.id, "Bring dice").await.unwrap();

        let inbox = h.services.messages.list_conversations(&ben).await.unwrap();
        assert_eq!(inbox[0].unread_count, 2);
        assert_eq!(inbox[0].last_message.as_ref().unwrap().content, "Bring dice");

        let messages = h.services.messages.list_messages(&ben, convo.id, Page::default()).await.unwrap();
        assert_eq!(messages[1].content, "Session zero on Friday?");

        let filter = NotificationFilter { unread_only: true, ..Default::default() };
        let notes = h.services.notifications.list(&ben, filter, Page::default()).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(h.services.notifications.unread_count(&kate).await.unwrap(), 0);

        assert_eq!(h.services.messages.mark_read(&ben, convo.id).await.unwrap(), 2);
        let inbox = h.services.messages.list_conversations(&ben).await.unwrap();
        assert_eq!(inbox[0].unread_count, 0);
    }
}
