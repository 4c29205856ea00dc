use async_trait::async_trait;
use dashmap::DashMap;
use domains::{DomainError, DomainResult, Page, RatingSummary, Review, ReviewRepository};
use uuid::Uuid;

use super::claim;

#[derive(Default)]
pub struct MemoryReviewRepo {
    reviews: DashMap<Uuid, Review>,
    /// (game, player) -> review id
    by_author: DashMap<(Uuid, Uuid), Uuid>,
}

impl MemoryReviewRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect(&self, pred: impl Fn(&Review) -> bool) -> Vec<Review> {
        let mut reviews: Vec<Review> = self
            .reviews
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| r.value().clone())
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reviews
    }
}

#[async_trait]
impl ReviewRepository for MemoryReviewRepo {
    async fn insert(&self, review: Review) -> DomainResult<Review> {
        claim(&self.by_author, (review.game_id, review.player_id), review.id)
            .map_err(|_| DomainError::conflict("you have already reviewed this game"))?;
        self.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn list_by_game(&self, game_id: Uuid) -> DomainResult<Vec<Review>> {
        Ok(self.collect(|r| r.game_id == game_id))
    }

    async fn list_by_gm(&self, gm_id: Uuid, page: Page) -> DomainResult<Vec<Review>> {
        Ok(page.apply(self.collect(|r| r.gm_id == gm_id)))
    }

    async fn rating_summary(&self, gm_id: Uuid) -> DomainResult<RatingSummary> {
        Ok(RatingSummary::from_ratings(
            self.reviews.iter().filter(|r| r.gm_id == gm_id).map(|r| r.rating),
        ))
    }
}
