use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    DomainError, DomainResult, GmApplication, GmPricing, Page, User, UserFilter, UserPreferences, UserRepository,
    UserStats,
};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{db_error, like_pattern, parse, push_page};

const COLUMNS: &str = "id, username, email, password_hash, display_name, bio, avatar_url, role, gm_application, \
                       preferences, stats, pricing, referral_code, referred_by, is_active, created_at, updated_at";

pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    display_name: String,
    bio: Option<String>,
    avatar_url: Option<String>,
    role: String,
    gm_application: Json<GmApplication>,
    preferences: Json<UserPreferences>,
    stats: Json<UserStats>,
    pricing: Option<Json<GmPricing>>,
    referral_code: String,
    referred_by: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> DomainResult<Self> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            display_name: row.display_name,
            bio: row.bio,
            avatar_url: row.avatar_url,
            role: parse(&row.role)?,
            gm_application: row.gm_application.0,
            preferences: row.preferences.0,
            stats: row.stats.0,
            pricing: row.pricing.map(|p| p.0),
            referral_code: row.referral_code,
            referred_by: row.referred_by,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    qb.push(" WHERE TRUE");
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(status) = filter.application_status {
        qb.push(" AND gm_application ->> 'status' = ").push_bind(status.as_str());
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = like_pattern(search);
        qb.push(" AND (username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR display_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(system) = filter.system.clone() {
        qb.push(" AND EXISTS (SELECT 1 FROM jsonb_array_elements_text(gm_application -> 'systems') s WHERE lower(s) = lower(")
            .push_bind(system)
            .push("))");
    }
    if let Some(exclude) = filter.exclude {
        qb.push(" AND id <> ").push_bind(exclude);
    }
    if filter.active_only {
        qb.push(" AND is_active");
    }
}

fn collect(rows: Vec<UserRow>) -> DomainResult<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

#[async_trait]
impl UserRepository for PgUserRepo {
    async fn insert(&self, user: User) -> DomainResult<User> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(user.email.to_lowercase())
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(user.role.as_str())
        .bind(Json(&user.gm_application))
        .bind(Json(&user.preferences))
        .bind(Json(&user.stats))
        .bind(user.pricing.as_ref().map(Json))
        .bind(&user.referral_code)
        .bind(user.referred_by)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_referral_code(&self, code: &str) -> DomainResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE referral_code = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_many(&self, ids: Vec<Uuid>) -> DomainResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        collect(rows)
    }

    /// Username, email and referral code are immutable after registration.
    async fn update(&self, user: User) -> DomainResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET password_hash = $2, display_name = $3, bio = $4, avatar_url = $5, role = $6, \
             gm_application = $7, preferences = $8, stats = $9, pricing = $10, referred_by = $11, \
             is_active = $12, updated_at = $13 \
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(user.role.as_str())
        .bind(Json(&user.gm_application))
        .bind(Json(&user.preferences))
        .bind(Json(&user.stats))
        .bind(user.pricing.as_ref().map(Json))
        .bind(user.referred_by)
        .bind(user.is_active)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.ok_or_else(|| DomainError::not_found("User", user.id))?.try_into()
    }

    async fn list(&self, filter: UserFilter, page: Page) -> DomainResult<Vec<User>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM users"));
        push_filter(&mut qb, &filter);
        qb.push(" ORDER BY created_at, id");
        push_page(&mut qb, page);
        let rows = qb.build_query_as::<UserRow>().fetch_all(&self.pool).await.map_err(db_error)?;
        collect(rows)
    }

    async fn count(&self, filter: UserFilter) -> DomainResult<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filter(&mut qb, &filter);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await.map_err(db_error)?;
        Ok(count as u64)
    }
}
