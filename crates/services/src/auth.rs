use std::sync::Arc;

use chrono::{DateTime, Utc};
use domains::{
    Actor, ApplicationStatus, CodeGenerator, DomainError, DomainResult, GmApplication, NewNotification,
    NotificationKind, PasswordHasher, Role, TokenIssuer, User, UserFilter, UserProfile, UserRepository,
};
use serde::{Deserialize, Serialize};

use crate::notifications::NotificationService;
use crate::users::collect_user_ids;
use crate::validate;

/// Attempts at drawing a referral code nobody holds yet.
const REFERRAL_CODE_ATTEMPTS: usize = 5;
const MAX_SYSTEMS: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    codes: Arc<dyn CodeGenerator>,
    notifier: NotificationService,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
        codes: Arc<dyn CodeGenerator>,
        notifier: NotificationService,
    ) -> Self {
        Self { users, hasher, tokens, codes, notifier }
    }

    pub async fn register(&self, input: RegisterInput) -> DomainResult<AuthSession> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();
        validate::username(&username)?;
        validate::email(&email)?;
        validate::password(&input.password)?;
        let display_name = validate::optional_text("display name", input.display_name.as_deref(), 50)?
            .unwrap_or_else(|| username.clone());

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(DomainError::conflict("email is already registered"));
        }

        let referrer = match input.referral_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(
                self.users
                    .find_by_referral_code(code)
                    .await?
                    .ok_or_else(|| DomainError::validation("referral code is invalid"))?,
            ),
            None => None,
        };

        let hash = self.hasher.hash(&input.password)?;
        let code = self.unused_referral_code().await?;
        let mut user = User::new(username, email, hash, display_name, code);
        user.referred_by = referrer.as_ref().map(|r| r.id);
        let user = self.users.insert(user).await?;
        tracing::info!(user_id = %user.id, referred = user.referred_by.is_some(), "user registered");

        if let Some(mut referrer) = referrer {
            referrer.stats.referrals += 1;
            referrer.updated_at = Utc::now();
            let referrer_id = referrer.id;
            if let Err(e) = self.users.update(referrer).await {
                tracing::warn!(%referrer_id, error = %e, "failed to credit referral");
            }
            let note = NewNotification::new(
                NotificationKind::ReferralUsed,
                "Your referral code was used",
                format!("{} joined with your referral code", user.display_name),
            )
            .actor(user.id)
            .link(format!("/users/{}", user.id));
            self.notifier.notify(referrer_id, &note).await;
        }

        self.session(&user)
    }

    pub async fn login(&self, email: &str, password: &str) -> DomainResult<AuthSession> {
        let invalid = || DomainError::Unauthorized("invalid email or password".into());
        let user = self.users.find_by_email(email.trim()).await?.ok_or_else(invalid)?;
        if !self.hasher.verify(password, &user.password_hash) {
            tracing::info!(user_id = %user.id, "failed login attempt");
            return Err(invalid());
        }
        if !user.is_active {
            return Err(DomainError::forbidden("account is deactivated"));
        }
        self.session(&user)
    }

    /// Resolves a bearer token to the acting user. The role comes from the
    /// store, so promotions and deactivations apply to live tokens.
    pub async fn authenticate(&self, token: &str) -> DomainResult<Actor> {
        let claims = self.tokens.verify(token)?;
        match self.users.find_by_id(claims.sub).await? {
            Some(user) if user.is_active => Ok(Actor::new(user.id, user.role)),
            Some(_) => Err(DomainError::Unauthorized("account is deactivated".into())),
            None => Err(DomainError::Unauthorized("account no longer exists".into())),
        }
    }

    pub async fn me(&self, actor: &Actor) -> DomainResult<UserProfile> {
        Ok(UserProfile::private(&self.load(actor).await?))
    }

    pub async fn change_password(&self, actor: &Actor, current: &str, new: &str) -> DomainResult<()> {
        let mut user = self.load(actor).await?;
        if !self.hasher.verify(current, &user.password_hash) {
            return Err(DomainError::Unauthorized("current password is incorrect".into()));
        }
        validate::password(new)?;
        user.password_hash = self.hasher.hash(new)?;
        user.updated_at = Utc::now();
        self.users.update(user).await?;
        tracing::info!(user_id = %actor.id, "password changed");
        Ok(())
    }

    pub async fn apply_gm(&self, actor: &Actor, experience: &str, systems: Vec<String>) -> DomainResult<UserProfile> {
        let mut user = self.load(actor).await?;
        if user.role != Role::Player {
            return Err(DomainError::conflict("you are already a GM"));
        }
        if user.has_pending_application() {
            return Err(DomainError::conflict("your GM application is already pending"));
        }
        let experience = validate::text("experience", experience, 2000)?;
        let systems: Vec<String> = systems
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if systems.is_empty() {
            return Err(DomainError::validation("list at least one game system"));
        }
        if systems.len() > MAX_SYSTEMS {
            return Err(DomainError::validation("too many game systems"));
        }

        let now = Utc::now();
        user.gm_application = GmApplication {
            status: ApplicationStatus::Pending,
            experience,
            systems,
            submitted_at: Some(now),
            ..GmApplication::default()
        };
        user.updated_at = now;
        let user = self.users.update(user).await?;
        tracing::info!(user_id = %user.id, "GM application submitted");

        let admins = collect_user_ids(
            self.users.as_ref(),
            UserFilter { role: Some(Role::Admin), active_only: true, ..Default::default() },
        )
        .await?;
        let note = NewNotification::new(
            NotificationKind::GmApplicationSubmitted,
            "New GM application",
            format!("{} applied to become a GM", user.display_name),
        )
        .actor(user.id)
        .link("/admin/gm-applications");
        self.notifier.fan_out(admins, &note).await;

        Ok(UserProfile::private(&user))
    }

    async fn load(&self, actor: &Actor) -> DomainResult<User> {
        self.users
            .find_by_id(actor.id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", actor.id))
    }

    async fn unused_referral_code(&self) -> DomainResult<String> {
        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let code = self.codes.referral_code();
            if self.users.find_by_referral_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(DomainError::internal("could not allocate a unique referral code"))
    }

    fn session(&self, user: &User) -> DomainResult<AuthSession> {
        let issued = self.tokens.issue(user.id, user.role)?;
        Ok(AuthSession { token: issued.token, expires_at: issued.expires_at, user: UserProfile::private(user) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use domains::{NotificationFilter, Page};

    fn input(username: &str, email: &str) -> RegisterInput {
        RegisterInput {
            username: username.into(),
            email: email.into(),
            password: "correct horse".into(),
            display_name: None,
            referral_code: None,
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let h = Harness::new();
        let session = h.services.auth.register(input("kate", "Kate@Example.com")).await.unwrap();
        assert_eq!(session.user.email.as_deref(), Some("kate@example.com"));
        assert_eq!(session.user.display_name, "kate");

        let login = h.services.auth.login("kate@example.com", "correct horse").await.unwrap();
        assert_eq!(login.user.id, session.user.id);

        let err = h.services.auth.login("kate@example.com", "wrong horse").await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn duplicate_email_or_username_conflicts() {
        let h = Harness::new();
        h.services.auth.register(input("kate", "kate@example.com")).await.unwrap();
        let dup_email = h.services.auth.register(input("other", "KATE@example.com")).await;
        assert!(matches!(dup_email, Err(DomainError::Conflict(_))));
        let dup_name = h.services.auth.register(input("Kate", "new@example.com")).await;
        assert!(matches!(dup_name, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn referral_credits_referrer() {
        let h = Harness::new();
        let referrer = h.services.auth.register(input("kate", "kate@example.com")).await.unwrap();
        let code = referrer.user.referral_code.clone().unwrap();

        let mut new_user = input("ben", "ben@example.com");
        new_user.referral_code = Some(code);
        let session = h.services.auth.register(new_user).await.unwrap();

        let stored = h.load(referrer.user.id).await;
        assert_eq!(stored.stats.referrals, 1);
        assert_eq!(h.load(session.user.id).await.referred_by, Some(stored.id));

        let actor = Actor::new(stored.id, stored.role);
        let notes = h.services.notifications.list(&actor, NotificationFilter::default(), Page::default()).await.unwrap();
        assert_eq!(notes[0].kind, NotificationKind::ReferralUsed);

        let mut bogus = input("cara", "cara@example.com");
        bogus.referral_code = Some("NOPE".into());
        assert!(matches!(h.services.auth.register(bogus).await, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn deactivated_users_cannot_log_in_or_use_tokens() {
        let h = Harness::new();
        let session = h.services.auth.register(input("kate", "kate@example.com")).await.unwrap();
        let mut user = h.load(session.user.id).await;
        user.is_active = false;
        h.ports.users.update(user).await.unwrap();

        let login = h.services.auth.login("kate@example.com", "correct horse").await;
        assert!(matches!(login, Err(DomainError::Forbidden(_))));
        let auth = h.services.auth.authenticate(&session.token).await;
        assert!(matches!(auth, Err(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn gm_application_notifies_admins_once() {
        let h = Harness::new();
        let admin = h.user("root", Role::Admin).await;
        let player = h.user("kate", Role::Player).await;

        let profile = h
            .services
            .auth
            .apply_gm(&player, "Ran a West Marches campaign for two years", vec!["D&D 5e".into()])
            .await
            .unwrap();
        assert_eq!(profile.gm_application_status, ApplicationStatus::Pending);

        let again = h.services.auth.apply_gm(&player, "again", vec!["D&D 5e".into()]).await;
        assert!(matches!(again, Err(DomainError::Conflict(_))));

        assert_eq!(h.services.notifications.unread_count(&admin).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn change_password_checks_current() {
        let h = Harness::new();
        let session = h.services.auth.register(input("kate", "kate@example.com")).await.unwrap();
        let actor = Actor::new(session.user.id, Role::Player);
        let wrong = h.services.auth.change_password(&actor, "nope", "new password!").await;
        assert!(matches!(wrong, Err(DomainError::Unauthorized(_))));
        h.services.auth.change_password(&actor, "correct horse", "new password!").await.unwrap();
        assert!(h.services.auth.login("kate@example.com", "new password!").await.is_ok());
    }
}
