//! Data persistence contracts. Unique constraints (one friendship per pair,
//! one favorite per user/GM, one review per game/player, ...) are the
//! store's job; a violation surfaces as `DomainError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::error::DomainResult;
use crate::models::{
    Booking, Conversation, Favorite, FriendRequest, Friendship, Game, GameFilter, Message, Notification,
    NotificationFilter, Page, RatingSummary, Review, User, UserFilter,
};

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Conflict on duplicate username, email or referral code.
    async fn insert(&self, user: User) -> DomainResult<User>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn find_by_referral_code(&self, code: &str) -> DomainResult<Option<User>>;
    async fn find_many(&self, ids: Vec<Uuid>) -> DomainResult<Vec<User>>;
    async fn update(&self, user: User) -> DomainResult<User>;
    /// Sorted by creation time, oldest first.
    async fn list(&self, filter: UserFilter, page: Page) -> DomainResult<Vec<User>>;
    async fn count(&self, filter: UserFilter) -> DomainResult<u64>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn insert(&self, game: Game) -> DomainResult<Game>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Game>>;
    /// Persists every field except `booked_seats`, which only moves through
    /// `reserve_seats` / `release_seats`.
    async fn update(&self, game: Game) -> DomainResult<Game>;
    async fn delete(&self, id: Uuid) -> DomainResult<bool>;
    /// Sorted by scheduled time, soonest first.
    async fn list(&self, filter: GameFilter, page: Page) -> DomainResult<Vec<Game>>;
    async fn count(&self, filter: GameFilter) -> DomainResult<u64>;
    /// Atomically adds `seats` to a scheduled game's booked seats if that
    /// keeps it within capacity. `None` when the seats are not available.
    async fn reserve_seats(&self, id: Uuid, seats: i32) -> DomainResult<Option<Game>>;
    /// Returns seats to the pool, never dropping below zero.
    async fn release_seats(&self, id: Uuid, seats: i32) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Conflict when the player already holds an active booking on the game.
    async fn insert(&self, booking: Booking) -> DomainResult<Booking>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>>;
    async fn update(&self, booking: Booking) -> DomainResult<Booking>;
    /// Newest first.
    async fn list_by_player(&self, player_id: Uuid, page: Page) -> DomainResult<Vec<Booking>>;
    async fn list_by_game(&self, game_id: Uuid) -> DomainResult<Vec<Booking>>;
    async fn find_active(&self, game_id: Uuid, player_id: Uuid) -> DomainResult<Option<Booking>>;
    async fn count(&self) -> DomainResult<u64>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Conflict on a second review of the same game by the same player.
    async fn insert(&self, review: Review) -> DomainResult<Review>;
    async fn list_by_game(&self, game_id: Uuid) -> DomainResult<Vec<Review>>;
    async fn list_by_gm(&self, gm_id: Uuid, page: Page) -> DomainResult<Vec<Review>>;
    async fn rating_summary(&self, gm_id: Uuid) -> DomainResult<RatingSummary>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn insert(&self, conversation: Conversation) -> DomainResult<Conversation>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Conversation>>;
    async fn find_direct(&self, a: Uuid, b: Uuid) -> DomainResult<Option<Conversation>>;
    /// Most recent activity first.
    async fn list_for_user(&self, user_id: Uuid) -> DomainResult<Vec<Conversation>>;
    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: Message) -> DomainResult<Message>;
    /// Newest first.
    async fn list(&self, conversation_id: Uuid, page: Page) -> DomainResult<Vec<Message>>;
    async fn last_message(&self, conversation_id: Uuid) -> DomainResult<Option<Message>>;
    async fn count_unread(&self, conversation_id: Uuid, user_id: Uuid) -> DomainResult<u64>;
    /// Adds `user_id` to the read set of every message it did not send.
    /// Returns how many messages changed.
    async fn mark_read(&self, conversation_id: Uuid, user_id: Uuid) -> DomainResult<u64>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait FriendRepository: Send + Sync {
    /// Conflict when a request from the same sender to the same recipient exists.
    async fn insert_request(&self, request: FriendRequest) -> DomainResult<FriendRequest>;
    async fn find_request(&self, id: Uuid) -> DomainResult<Option<FriendRequest>>;
    /// Requests in either direction between the two users.
    async fn requests_between(&self, a: Uuid, b: Uuid) -> DomainResult<Vec<FriendRequest>>;
    async fn update_request(&self, request: FriendRequest) -> DomainResult<FriendRequest>;
    async fn delete_request(&self, id: Uuid) -> DomainResult<bool>;
    async fn delete_requests_between(&self, a: Uuid, b: Uuid) -> DomainResult<u64>;
    async fn list_incoming(&self, user_id: Uuid) -> DomainResult<Vec<FriendRequest>>;
    async fn list_outgoing(&self, user_id: Uuid) -> DomainResult<Vec<FriendRequest>>;

    /// Conflict when the pair is already friends.
    async fn insert_friendship(&self, friendship: Friendship) -> DomainResult<Friendship>;
    async fn find_friendship(&self, a: Uuid, b: Uuid) -> DomainResult<Option<Friendship>>;
    async fn delete_friendship(&self, a: Uuid, b: Uuid) -> DomainResult<bool>;
    async fn list_friendships(&self, user_id: Uuid) -> DomainResult<Vec<Friendship>>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert_many(&self, notifications: Vec<Notification>) -> DomainResult<u64>;
    /// Newest first.
    async fn list(&self, user_id: Uuid, filter: NotificationFilter, page: Page) -> DomainResult<Vec<Notification>>;
    async fn count_unread(&self, user_id: Uuid) -> DomainResult<u64>;
    /// `None` when the notification does not exist or belongs to someone else.
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> DomainResult<Option<Notification>>;
    async fn mark_all_read(&self, user_id: Uuid) -> DomainResult<u64>;
    async fn delete(&self, id: Uuid, user_id: Uuid) -> DomainResult<bool>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// Conflict when the GM is already a favorite.
    async fn insert(&self, favorite: Favorite) -> DomainResult<Favorite>;
    async fn delete(&self, user_id: Uuid, gm_id: Uuid) -> DomainResult<bool>;
    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> DomainResult<Vec<Favorite>>;
}
