use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A player's rating of a GM's game. One per (game, player).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub game_id: Uuid,
    pub gm_id: Uuid,
    pub player_id: Uuid,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub const MIN_RATING: u8 = 1;
    pub const MAX_RATING: u8 = 5;

    pub fn new(game_id: Uuid, gm_id: Uuid, player_id: Uuid, rating: u8, comment: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            game_id,
            gm_id,
            player_id,
            rating,
            comment,
            created_at: Utc::now(),
        }
    }
}

/// Aggregate of a GM's reviews, written back into `UserStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub count: i32,
    pub average: f64,
}

impl RatingSummary {
    pub fn from_ratings(ratings: impl IntoIterator<Item = u8>) -> Self {
        let (count, sum) = ratings
            .into_iter()
            .fold((0i32, 0u32), |(c, s), r| (c + 1, s + u32::from(r)));
        let average = if count == 0 { 0.0 } else { f64::from(sum) / f64::from(count) };
        Self { count, average }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_averages_ratings() {
        let summary = RatingSummary::from_ratings([5, 4, 3]);
        assert_eq!(summary.count, 3);
        assert!((summary.average - 4.0).abs() < f64::EPSILON);
        assert_eq!(RatingSummary::from_ratings([]), RatingSummary::default());
    }
}
