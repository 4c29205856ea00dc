use std::sync::Arc;

use chrono::Utc;
use domains::{
    Actor, BookingRepository, BookingStatus, DomainError, DomainResult, GameRepository, NewNotification,
    NotificationKind, Page, Review, ReviewRepository, UserRepository,
};
use uuid::Uuid;

use crate::notifications::NotificationService;
use crate::validate;

#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    games: Arc<dyn GameRepository>,
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserRepository>,
    notifier: NotificationService,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        games: Arc<dyn GameRepository>,
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        notifier: NotificationService,
    ) -> Self {
        Self { reviews, games, bookings, users, notifier }
    }

    /// Only players with a confirmed booking may review, and only once the
    /// game has started.
    pub async fn create(&self, actor: &Actor, game_id: Uuid, rating: u8, comment: Option<String>) -> DomainResult<Review> {
        if !(Review::MIN_RATING..=Review::MAX_RATING).contains(&rating) {
            return Err(DomainError::validation("rating must be between 1 and 5"));
        }
        let comment = validate::optional_text("comment", comment.as_deref(), 2000)?;
        let game = self
            .games
            .find_by_id(game_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Game", game_id))?;
        if !game.has_started(Utc::now()) {
            return Err(DomainError::validation("you can review a game once it has started"));
        }
        let attended = self
            .bookings
            .find_active(game_id, actor.id)
            .await?
            .is_some_and(|b| b.status == BookingStatus::Confirmed);
        if !attended {
            return Err(DomainError::forbidden("only players with a confirmed booking can review"));
        }

        let review = self
            .reviews
            .insert(Review::new(game.id, game.gm_id, actor.id, rating, comment))
            .await?;
        self.refresh_gm_rating(game.gm_id).await?;

        let note = NewNotification::new(
            NotificationKind::NewReview,
            "New review",
            format!("Your game \"{}\" received a {rating}-star review", game.title),
        )
        .actor(actor.id)
        .related(review.id)
        .link(format!("/games/{}", game.id));
        self.notifier.notify(game.gm_id, &note).await;
        Ok(review)
    }

    pub async fn list_for_game(&self, game_id: Uuid) -> DomainResult<Vec<Review>> {
        self.reviews.list_by_game(game_id).await
    }

    pub async fn list_for_gm(&self, gm_id: Uuid, page: Page) -> DomainResult<Vec<Review>> {
        self.reviews.list_by_gm(gm_id, page).await
    }

    async fn refresh_gm_rating(&self, gm_id: Uuid) -> DomainResult<()> {
        let summary = self.reviews.rating_summary(gm_id).await?;
        let Some(mut gm) = self.users.find_by_id(gm_id).await? else {
            return Ok(());
        };
        gm.stats.review_count = summary.count;
        gm.stats.average_rating = (summary.average * 100.0).round() / 100.0;
        gm.updated_at = Utc::now();
        self.users.update(gm).await?;
        Ok(())
    }
}
