use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's bookmark of a GM. Unique per (user, GM).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub gm_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Favorite {
    pub fn new(user_id: Uuid, gm_id: Uuid) -> Self {
        Self { id: Uuid::now_v7(), user_id, gm_id, created_at: Utc::now() }
    }
}
