use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum! {
    pub enum NotificationCategory {
        Social => "social",
        System => "system",
        Game => "game",
    }
}

text_enum! {
    pub enum NotificationPriority {
        Low => "low",
        Normal => "normal",
        High => "high",
    }
}

text_enum! {
    pub enum NotificationKind {
        FriendRequest => "friend_request",
        FriendAccepted => "friend_accepted",
        NewMessage => "new_message",
        BookingCreated => "booking_created",
        BookingCancelled => "booking_cancelled",
        GameCancelled => "game_cancelled",
        GameDeleted => "game_deleted",
        NewReview => "new_review",
        PaymentReceived => "payment_received",
        GmApplicationSubmitted => "gm_application_submitted",
        GmApplicationApproved => "gm_application_approved",
        GmApplicationRejected => "gm_application_rejected",
        ReferralUsed => "referral_used",
        Announcement => "announcement",
    }
}

impl NotificationKind {
    pub fn category(&self) -> NotificationCategory {
        use NotificationKind::*;
        match self {
            FriendRequest | FriendAccepted | NewMessage | ReferralUsed => NotificationCategory::Social,
            BookingCreated | BookingCancelled | GameCancelled | GameDeleted | NewReview | PaymentReceived => {
                NotificationCategory::Game
            }
            GmApplicationSubmitted | GmApplicationApproved | GmApplicationRejected | Announcement => {
                NotificationCategory::System
            }
        }
    }

    pub fn default_priority(&self) -> NotificationPriority {
        use NotificationKind::*;
        match self {
            GameCancelled | GameDeleted | GmApplicationApproved | GmApplicationRejected => NotificationPriority::High,
            NewMessage | ReferralUsed => NotificationPriority::Low,
            _ => NotificationPriority::Normal,
        }
    }
}

/// One record per recipient; fan-out creates one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    /// The user whose action triggered the notification
    pub actor_id: Option<Uuid>,
    /// Game, booking, conversation or request the notification refers to
    pub related_id: Option<Uuid>,
    /// Client-side route to open (e.g., "/games/<id>")
    pub link: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Recipient-independent notification content, stamped per recipient by
/// [`NewNotification::for_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    pub actor_id: Option<Uuid>,
    pub related_id: Option<Uuid>,
    pub link: Option<String>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            priority: kind.default_priority(),
            title: title.into(),
            message: message.into(),
            actor_id: None,
            related_id: None,
            link: None,
        }
    }

    pub fn actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn related(mut self, related_id: Uuid) -> Self {
        self.related_id = Some(related_id);
        self
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn for_user(&self, user_id: Uuid) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            user_id,
            kind: self.kind,
            category: self.kind.category(),
            priority: self.priority,
            title: self.title.clone(),
            message: self.message.clone(),
            actor_id: self.actor_id,
            related_id: self.related_id,
            link: self.link.clone(),
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationFilter {
    pub unread_only: bool,
    pub category: Option<NotificationCategory>,
}

impl NotificationFilter {
    pub fn matches(&self, n: &Notification) -> bool {
        (!self.unread_only || !n.is_read) && self.category.map_or(true, |c| c == n.category)
    }
}
