//! # PostgreSQL repositories
//!
//! Maps the relational schema in `migrations/` onto the `domains` models.
//! Nested documents (GM application, preferences, stats, pricing) live in
//! JSONB columns; enums are stored as their snake_case text.

mod bookings;
mod favorites;
mod games;
mod messaging;
mod notifications;
mod reviews;
mod social;
mod users;

pub use bookings::PgBookingRepo;
pub use favorites::PgFavoriteRepo;
pub use games::PgGameRepo;
pub use messaging::{PgConversationRepo, PgMessageRepo};
pub use notifications::PgNotificationRepo;
pub use reviews::PgReviewRepo;
pub use social::PgFriendRepo;
pub use users::PgUserRepo;

use std::str::FromStr;
use std::time::Duration;

use domains::{DomainError, DomainResult, Page};
use sqlx::error::ErrorKind;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await
}

pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Translates driver errors, turning constraint violations into
/// `Conflict` with a message naming the violated rule.
pub(crate) fn db_error(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        match db.kind() {
            ErrorKind::UniqueViolation | ErrorKind::CheckViolation => {
                return DomainError::Conflict(constraint_message(db.constraint()).to_string());
            }
            ErrorKind::ForeignKeyViolation => {
                return DomainError::validation("referenced record does not exist");
            }
            _ => {}
        }
    }
    tracing::error!(error = %err, "database error");
    DomainError::internal(err)
}

fn constraint_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "email is already registered",
        Some("users_username_key") => "username is taken",
        Some("users_referral_code_key") => "referral code collision",
        Some("games_seats_within_capacity") => "capacity cannot drop below booked seats",
        Some("bookings_active_player_game_key") => "you already have a booking for this game",
        Some("reviews_game_player_key") => "you have already reviewed this game",
        Some("conversations_direct_key") => "a direct conversation already exists",
        Some("friend_requests_pair_key") => "friend request already sent",
        Some("friend_requests_pending_pair_key") => "a friend request between you is already pending",
        Some("friendships_pair_key") => "already friends",
        Some("favorites_user_gm_key") => "GM is already in your favorites",
        _ => "resource already exists",
    }
}

pub(crate) fn parse<T: FromStr<Err = DomainError>>(value: &str) -> DomainResult<T> {
    value.parse()
}

/// Escapes `%`, `_` and `\` so user input matches literally inside ILIKE.
pub(crate) fn like_pattern(input: &str) -> String {
    let escaped = input.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

pub(crate) fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: Page) {
    qb.push(" LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(i64::from(page.offset));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn unknown_constraint_gets_generic_message() {
        assert_eq!(constraint_message(Some("friendships_pair_key")), "already friends");
        assert_eq!(
            constraint_message(Some("friend_requests_pending_pair_key")),
            "a friend request between you is already pending"
        );
        assert_eq!(constraint_message(None), "resource already exists");
    }
}
