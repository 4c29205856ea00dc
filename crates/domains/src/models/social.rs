use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum! {
    pub enum FriendRequestStatus {
        Pending => "pending",
        Accepted => "accepted",
    }
}

/// Unique per (sender, recipient). Declined requests are deleted, so only
/// pending and accepted ones are ever stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub status: FriendRequestStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl FriendRequest {
    pub fn new(sender_id: Uuid, recipient_id: Uuid, note: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            sender_id,
            recipient_id,
            status: FriendRequestStatus::Pending,
            note,
            created_at: Utc::now(),
            responded_at: None,
        }
    }

    pub fn is_between(&self, a: Uuid, b: Uuid) -> bool {
        (self.sender_id == a && self.recipient_id == b) || (self.sender_id == b && self.recipient_id == a)
    }
}

/// An unordered pair, stored with the smaller id first so the pair has a
/// single representation for the uniqueness constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    pub id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn new(x: Uuid, y: Uuid) -> Self {
        let (user_a, user_b) = Self::pair(x, y);
        Self { id: Uuid::now_v7(), user_a, user_b, created_at: Utc::now() }
    }

    pub fn pair(x: Uuid, y: Uuid) -> (Uuid, Uuid) {
        if x <= y { (x, y) } else { (y, x) }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user_a == user_id || self.user_b == user_id
    }

    /// The friend of `user_id` in this pair.
    pub fn other(&self, user_id: Uuid) -> Uuid {
        if self.user_a == user_id { self.user_b } else { self.user_a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendship_pair_is_order_independent() {
        let (x, y) = (Uuid::now_v7(), Uuid::now_v7());
        let f1 = Friendship::new(x, y);
        let f2 = Friendship::new(y, x);
        assert_eq!((f1.user_a, f1.user_b), (f2.user_a, f2.user_b));
        assert_eq!(f1.other(x), y);
    }
}
