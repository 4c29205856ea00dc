use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum! {
    pub enum Platform {
        Online => "online",
        InPerson => "in_person",
        Hybrid => "hybrid",
    }
}

text_enum! {
    /// How close to the start a paid booking can still be refunded.
    pub enum CancellationPolicy {
        Flexible => "flexible",
        Moderate => "moderate",
        Strict => "strict",
    }
}

impl CancellationPolicy {
    /// Hours before the start after which cancellations are no longer
    /// refunded. `None` means never refunded.
    pub fn refund_window_hours(&self) -> Option<i64> {
        match self {
            Self::Flexible => Some(24),
            Self::Moderate => Some(72),
            Self::Strict => None,
        }
    }

    pub fn is_refundable(&self, starts_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.refund_window_hours() {
            Some(hours) => now <= starts_at - Duration::hours(hours),
            None => false,
        }
    }
}

text_enum! {
    pub enum ExperienceLevel {
        All => "all",
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
    }
}

text_enum! {
    pub enum GameStatus {
        Scheduled => "scheduled",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

/// A hosted session. `booked_seats` is maintained by the store's atomic
/// seat reservation and never exceeds `capacity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: Uuid,
    pub gm_id: Uuid,
    pub title: String,
    pub description: String,
    /// The rules system (e.g., "D&D 5e")
    pub system: String,
    pub platform: Platform,
    /// Address for in-person games or a VTT link for online ones
    pub location: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub capacity: i32,
    pub booked_seats: i32,
    pub price_cents: i64,
    pub currency: String,
    pub cancellation_policy: CancellationPolicy,
    pub experience_level: ExperienceLevel,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    pub const MAX_CAPACITY: i32 = 20;

    pub fn available_seats(&self) -> i32 {
        (self.capacity - self.booked_seats).max(0)
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at <= now
    }

    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        self.status == GameStatus::Scheduled && !self.has_started(now)
    }

    pub fn is_free(&self) -> bool {
        self.price_cents == 0
    }
}

/// Input for creating a game. Validation happens in the service layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGame {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub system: String,
    pub platform: Platform,
    pub location: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub capacity: i32,
    #[serde(default)]
    pub price_cents: i64,
    pub currency: Option<String>,
    pub cancellation_policy: Option<CancellationPolicy>,
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub system: Option<String>,
    pub platform: Option<Platform>,
    pub location: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub capacity: Option<i32>,
    pub price_cents: Option<i64>,
    pub cancellation_policy: Option<CancellationPolicy>,
    pub experience_level: Option<ExperienceLevel>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GameFilter {
    pub system: Option<String>,
    pub platform: Option<Platform>,
    pub gm_id: Option<Uuid>,
    pub status: Option<GameStatus>,
    /// Case-insensitive substring over title and description
    pub search: Option<String>,
    /// Only games starting after this instant
    pub starts_after: Option<DateTime<Utc>>,
    pub has_open_seats: bool,
}

impl GameFilter {
    pub fn matches(&self, game: &Game) -> bool {
        if let Some(system) = self.system.as_deref() {
            if !game.system.eq_ignore_ascii_case(system) {
                return false;
            }
        }
        if self.platform.is_some_and(|p| p != game.platform) {
            return false;
        }
        if self.gm_id.is_some_and(|id| id != game.gm_id) {
            return false;
        }
        if self.status.is_some_and(|s| s != game.status) {
            return false;
        }
        if let Some(needle) = self.search.as_deref().map(str::to_lowercase) {
            if !game.title.to_lowercase().contains(&needle)
                && !game.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if self.starts_after.is_some_and(|t| game.scheduled_at <= t) {
            return false;
        }
        !self.has_open_seats || game.available_seats() > 0
    }
}
