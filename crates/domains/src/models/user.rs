use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum! {
    /// Account role. A "GM applicant" is a `Player` whose
    /// [`GmApplication`] is pending.
    pub enum Role {
        Player => "player",
        Gm => "gm",
        Admin => "admin",
    }
}

text_enum! {
    pub enum ApplicationStatus {
        None => "none",
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmApplication {
    pub status: ApplicationStatus,
    pub experience: String,
    /// Game systems the applicant runs (e.g., "D&D 5e", "Call of Cthulhu")
    pub systems: Vec<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub reviewer_notes: Option<String>,
}

impl Default for GmApplication {
    fn default() -> Self {
        Self {
            status: ApplicationStatus::None,
            experience: String::new(),
            systems: Vec::new(),
            submitted_at: None,
            reviewed_at: None,
            reviewed_by: None,
            reviewer_notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub email_notifications: bool,
    pub allow_friend_requests: bool,
    pub favorite_systems: Vec<String>,
    pub timezone: Option<String>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            email_notifications: true,
            allow_friend_requests: true,
            favorite_systems: Vec::new(),
            timezone: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStats {
    pub games_played: i32,
    pub games_hosted: i32,
    pub review_count: i32,
    pub average_rating: f64,
    pub referrals: i32,
}

/// What a GM charges per seat unless a game overrides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmPricing {
    pub per_session_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Always stored lower-cased
    pub email: String,
    #[serde(skip, default)]
    pub password_hash: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub gm_application: GmApplication,
    pub preferences: UserPreferences,
    pub stats: UserStats,
    pub pricing: Option<GmPricing>,
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: String,
        email: String,
        password_hash: String,
        display_name: String,
        referral_code: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            username,
            email: email.to_lowercase(),
            password_hash,
            display_name,
            bio: None,
            avatar_url: None,
            role: Role::Player,
            gm_application: GmApplication::default(),
            preferences: UserPreferences::default(),
            stats: UserStats::default(),
            pricing: None,
            referral_code,
            referred_by: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Approved GMs and admins may host games.
    pub fn can_host(&self) -> bool {
        matches!(self.role, Role::Gm | Role::Admin)
    }

    pub fn has_pending_application(&self) -> bool {
        self.gm_application.status == ApplicationStatus::Pending
    }
}

/// The caller's identity after token verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Profile view returned to clients. The email is only present when the
/// viewer is the user themself or an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub gm_application_status: ApplicationStatus,
    pub stats: UserStats,
    pub pricing: Option<GmPricing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<UserPreferences>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn public(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: None,
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
            role: user.role,
            gm_application_status: user.gm_application.status,
            stats: user.stats.clone(),
            pricing: user.pricing.clone(),
            referral_code: None,
            preferences: None,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }

    /// The full view, for the account owner or an admin.
    pub fn private(user: &User) -> Self {
        Self {
            email: Some(user.email.clone()),
            referral_code: Some(user.referral_code.clone()),
            preferences: Some(user.preferences.clone()),
            ..Self::public(user)
        }
    }

    pub fn for_viewer(user: &User, viewer: Option<&Actor>) -> Self {
        match viewer {
            Some(actor) if actor.id == user.id || actor.is_admin() => Self::private(user),
            _ => Self::public(user),
        }
    }
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub preferences: Option<UserPreferences>,
    pub pricing: Option<GmPricing>,
}

/// Filter for user listings (GM directory, admin back office, search).
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub application_status: Option<ApplicationStatus>,
    /// Case-insensitive substring over username and display name
    pub search: Option<String>,
    /// Matches GMs whose application lists this system
    pub system: Option<String>,
    pub exclude: Option<Uuid>,
    pub active_only: bool,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        if let Some(status) = self.application_status {
            if user.gm_application.status != status {
                return false;
            }
        }
        if let Some(needle) = self.search.as_deref().map(str::to_lowercase) {
            if !user.username.to_lowercase().contains(&needle)
                && !user.display_name.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(system) = self.system.as_deref().map(str::to_lowercase) {
            if !user.gm_application.systems.iter().any(|s| s.to_lowercase() == system) {
                return false;
            }
        }
        if self.exclude == Some(user.id) {
            return false;
        }
        !self.active_only || user.is_active
    }
}
