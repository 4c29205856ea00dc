//! # services
//!
//! Use cases of the Questboard marketplace. Every service is a cheap
//! `Clone` over `Arc`ed ports, so the HTTP layer can hold one
//! [`AppServices`] in its state and hand out copies per request.
//!
//! Notifications are a side effect of many operations here. They go
//! through [`NotificationService`], which logs and swallows store failures
//! so a notification problem never fails the operation that triggered it.

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod games;
pub mod media;
pub mod messages;
pub mod notifications;
pub mod payments;
pub mod reviews;
pub mod social;
pub mod users;
mod validate;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin::{AdminService, AdminStats, Audience, DeletedGame, GmApplicationView};
pub use auth::{AuthService, AuthSession, RegisterInput};
pub use bookings::BookingService;
pub use games::{GameQuery, GameService};
pub use media::MediaService;
pub use messages::MessageService;
pub use notifications::NotificationService;
pub use payments::{PaymentIntent, PaymentService};
pub use reviews::ReviewService;
pub use social::{FriendRequestView, SocialService};
pub use users::UserService;

use std::sync::Arc;

use domains::{
    BookingRepository, CodeGenerator, ConversationRepository, FavoriteRepository, FriendRepository, GameRepository,
    MediaStorage, MessageRepository, NotificationRepository, PasswordHasher, ReviewRepository, TokenIssuer,
    UserRepository,
};
use serde::Serialize;

/// The adapters a deployment plugs in.
#[derive(Clone)]
pub struct Ports {
    pub users: Arc<dyn UserRepository>,
    pub games: Arc<dyn GameRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub friends: Arc<dyn FriendRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub favorites: Arc<dyn FavoriteRepository>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub codes: Arc<dyn CodeGenerator>,
    pub media: Arc<dyn MediaStorage>,
}

#[derive(Debug, Clone, Copy)]
pub struct ServiceOptions {
    /// Upper bound for a single uploaded image
    pub max_upload_bytes: u64,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self { max_upload_bytes: 5 * 1024 * 1024 }
    }
}

#[derive(Clone)]
pub struct AppServices {
    pub auth: AuthService,
    pub users: UserService,
    pub games: GameService,
    pub bookings: BookingService,
    pub reviews: ReviewService,
    pub messages: MessageService,
    pub social: SocialService,
    pub notifications: NotificationService,
    pub admin: AdminService,
    pub payments: PaymentService,
    pub media: MediaService,
}

impl AppServices {
    pub fn new(ports: Ports, options: ServiceOptions) -> Self {
        let notifications = NotificationService::new(ports.notifications.clone());
        let games = GameService::new(
            ports.games.clone(),
            ports.bookings.clone(),
            ports.users.clone(),
            notifications.clone(),
        );
        Self {
            auth: AuthService::new(
                ports.users.clone(),
                ports.hasher.clone(),
                ports.tokens.clone(),
                ports.codes.clone(),
                notifications.clone(),
            ),
            users: UserService::new(ports.users.clone(), ports.favorites.clone(), ports.reviews.clone()),
            bookings: BookingService::new(ports.games.clone(), ports.bookings.clone(), notifications.clone()),
            reviews: ReviewService::new(
                ports.reviews.clone(),
                ports.games.clone(),
                ports.bookings.clone(),
                ports.users.clone(),
                notifications.clone(),
            ),
            messages: MessageService::new(
                ports.conversations.clone(),
                ports.messages.clone(),
                ports.users.clone(),
                notifications.clone(),
            ),
            social: SocialService::new(ports.users.clone(), ports.friends.clone(), notifications.clone()),
            admin: AdminService::new(
                ports.users.clone(),
                ports.games.clone(),
                ports.bookings.clone(),
                games.clone(),
                notifications.clone(),
            ),
            payments: PaymentService::new(ports.bookings.clone(), ports.games.clone(), notifications.clone()),
            media: MediaService::new(ports.media.clone(), ports.users.clone(), options.max_upload_bytes),
            games,
            notifications,
        }
    }
}

/// One page of a listing plus the total number of matches.
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> Listing<T> {
    pub fn new(items: Vec<T>, total: u64, page: domains::Page) -> Self {
        Self { items, total, limit: page.limit, offset: page.offset }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}
