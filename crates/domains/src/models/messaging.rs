use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum! {
    pub enum ConversationKind {
        Direct => "direct",
        Group => "group",
    }
}

/// A direct or group messaging thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub kind: ConversationKind,
    /// Required for groups, unused for direct conversations
    pub name: Option<String>,
    pub participants: Vec<Uuid>,
    pub created_by: Uuid,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn direct(a: Uuid, b: Uuid) -> Self {
        Self::build(ConversationKind::Direct, None, vec![a, b], a)
    }

    pub fn group(name: String, created_by: Uuid, mut participants: Vec<Uuid>) -> Self {
        if !participants.contains(&created_by) {
            participants.insert(0, created_by);
        }
        Self::build(ConversationKind::Group, Some(name), participants, created_by)
    }

    fn build(kind: ConversationKind, name: Option<String>, participants: Vec<Uuid>, created_by: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            name,
            participants,
            created_by,
            last_message_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participants.contains(&user_id)
    }

    /// True for a direct conversation between exactly these two users.
    pub fn is_direct_between(&self, a: Uuid, b: Uuid) -> bool {
        self.kind == ConversationKind::Direct
            && self.participants.len() == 2
            && self.is_participant(a)
            && self.is_participant(b)
    }

    pub fn others(&self, user_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.participants.iter().copied().filter(move |p| *p != user_id)
    }

    /// Sort key for conversation lists: last activity, else creation.
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    /// Set for direct conversations only
    pub recipient_id: Option<Uuid>,
    pub content: String,
    pub read_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub const MAX_LEN: usize = 2000;

    pub fn new(conversation: &Conversation, sender_id: Uuid, content: String) -> Self {
        let recipient_id = match conversation.kind {
            ConversationKind::Direct => conversation.others(sender_id).next(),
            ConversationKind::Group => None,
        };
        Self {
            id: Uuid::now_v7(),
            conversation_id: conversation.id,
            sender_id,
            recipient_id,
            content,
            read_by: vec![sender_id],
            created_at: Utc::now(),
        }
    }

    pub fn is_unread_by(&self, user_id: Uuid) -> bool {
        self.sender_id != user_id && !self.read_by.contains(&user_id)
    }
}

/// A conversation as shown in the caller's inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub last_message: Option<Message>,
    pub unread_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_message_targets_the_other_participant() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let convo = Conversation::direct(a, b);
        let msg = Message::new(&convo, a, "hi".into());
        assert_eq!(msg.recipient_id, Some(b));
        assert!(!msg.is_unread_by(a));
        assert!(msg.is_unread_by(b));
        assert!(convo.is_direct_between(b, a));
    }

    #[test]
    fn group_always_contains_creator() {
        let creator = Uuid::now_v7();
        let convo = Conversation::group("Table".into(), creator, vec![Uuid::now_v7(), Uuid::now_v7()]);
        assert!(convo.is_participant(creator));
        assert_eq!(convo.participants.len(), 3);
        let msg = Message::new(&convo, creator, "session zero".into());
        assert_eq!(msg.recipient_id, None);
    }
}
