//! Back-office operations. Every method checks the admin role first.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    Actor, ApplicationStatus, BookingRepository, DomainError, DomainResult, Game, GameFilter, GameRepository,
    GameStatus, GmApplication, NewNotification, NotificationKind, NotificationPriority, Page, Role, User,
    UserFilter, UserProfile, UserRepository,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::games::GameService;
use crate::notifications::NotificationService;
use crate::users::collect_user_ids;
use crate::{validate, Listing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    All,
    Players,
    Gms,
}

impl Audience {
    fn role(self) -> Option<Role> {
        match self {
            Self::All => None,
            Self::Players => Some(Role::Player),
            Self::Gms => Some(Role::Gm),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub users: u64,
    pub players: u64,
    pub gms: u64,
    pub admins: u64,
    pub inactive_users: u64,
    pub pending_gm_applications: u64,
    pub games: u64,
    pub scheduled_games: u64,
    pub bookings: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GmApplicationView {
    pub user: UserProfile,
    pub application: GmApplication,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedGame {
    pub game_id: Uuid,
    pub cancelled_bookings: usize,
}

#[derive(Clone)]
pub struct AdminService {
    users: Arc<dyn UserRepository>,
    games: Arc<dyn GameRepository>,
    bookings: Arc<dyn BookingRepository>,
    game_service: GameService,
    notifier: NotificationService,
}

fn require_admin(actor: &Actor) -> DomainResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(DomainError::forbidden("admin access required"))
    }
}

impl AdminService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        games: Arc<dyn GameRepository>,
        bookings: Arc<dyn BookingRepository>,
        game_service: GameService,
        notifier: NotificationService,
    ) -> Self {
        Self { users, games, bookings, game_service, notifier }
    }

    pub async fn stats(&self, actor: &Actor) -> DomainResult<AdminStats> {
        require_admin(actor)?;
        let by_role = |role| UserFilter { role: Some(role), ..Default::default() };
        let all_users = self.users.count(UserFilter::default()).await?;
        let active_users = self.users.count(UserFilter { active_only: true, ..Default::default() }).await?;
        Ok(AdminStats {
            users: all_users,
            players: self.users.count(by_role(Role::Player)).await?,
            gms: self.users.count(by_role(Role::Gm)).await?,
            admins: self.users.count(by_role(Role::Admin)).await?,
            inactive_users: all_users.saturating_sub(active_users),
            pending_gm_applications: self
                .users
                .count(UserFilter { application_status: Some(ApplicationStatus::Pending), ..Default::default() })
                .await?,
            games: self.games.count(GameFilter::default()).await?,
            scheduled_games: self
                .games
                .count(GameFilter { status: Some(GameStatus::Scheduled), ..Default::default() })
                .await?,
            bookings: self.bookings.count().await?,
        })
    }

    pub async fn list_users(
        &self,
        actor: &Actor,
        role: Option<Role>,
        search: Option<String>,
        page: Page,
    ) -> DomainResult<Listing<UserProfile>> {
        require_admin(actor)?;
        let filter = UserFilter { role, search: search.filter(|s| !s.trim().is_empty()), ..Default::default() };
        let total = self.users.count(filter.clone()).await?;
        let items = self.users.list(filter, page).await?;
        Ok(Listing::new(items, total, page).map(|u| UserProfile::private(&u)))
    }

    pub async fn set_user_active(&self, actor: &Actor, user_id: Uuid, active: bool) -> DomainResult<UserProfile> {
        require_admin(actor)?;
        if user_id == actor.id {
            return Err(DomainError::validation("you cannot change your own account status"));
        }
        let mut user = self.find_user(user_id).await?;
        user.is_active = active;
        user.updated_at = Utc::now();
        let user = self.users.update(user).await?;
        tracing::info!(admin_id = %actor.id, %user_id, active, "user status changed");
        Ok(UserProfile::private(&user))
    }

    pub async fn set_user_role(&self, actor: &Actor, user_id: Uuid, role: Role) -> DomainResult<UserProfile> {
        require_admin(actor)?;
        if user_id == actor.id {
            return Err(DomainError::validation("you cannot change your own role"));
        }
        let mut user = self.find_user(user_id).await?;
        user.role = role;
        user.updated_at = Utc::now();
        let user = self.users.update(user).await?;
        tracing::info!(admin_id = %actor.id, %user_id, role = %role, "user role changed");
        Ok(UserProfile::private(&user))
    }

    pub async fn list_gm_applications(&self, actor: &Actor, page: Page) -> DomainResult<Listing<GmApplicationView>> {
        require_admin(actor)?;
        let filter = UserFilter { application_status: Some(ApplicationStatus::Pending), ..Default::default() };
        let total = self.users.count(filter.clone()).await?;
        let items = self.users.list(filter, page).await?;
        Ok(Listing::new(items, total, page).map(|u| GmApplicationView {
            user: UserProfile::private(&u),
            application: u.gm_application,
        }))
    }

    /// Approving promotes the applicant to GM. Either way they are notified.
    pub async fn review_gm_application(
        &self,
        actor: &Actor,
        user_id: Uuid,
        approve: bool,
        notes: Option<String>,
    ) -> DomainResult<UserProfile> {
        require_admin(actor)?;
        let mut user = self.find_user(user_id).await?;
        if !user.has_pending_application() {
            return Err(DomainError::conflict("there is no pending application for this user"));
        }
        let now = Utc::now();
        let notes = validate::optional_text("notes", notes.as_deref(), 1000)?;
        user.gm_application.status = if approve { ApplicationStatus::Approved } else { ApplicationStatus::Rejected };
        user.gm_application.reviewed_at = Some(now);
        user.gm_application.reviewed_by = Some(actor.id);
        user.gm_application.reviewer_notes = notes.clone();
        if approve {
            user.role = Role::Gm;
        }
        user.updated_at = now;
        let user = self.users.update(user).await?;
        tracing::info!(admin_id = %actor.id, %user_id, approve, "GM application reviewed");

        let note = if approve {
            NewNotification::new(
                NotificationKind::GmApplicationApproved,
                "You're a GM!",
                "Your GM application was approved. You can now host games.",
            )
            .link("/games/new")
            .actor(actor.id)
        } else {
            let reason = notes.map_or_else(String::new, |n| format!(" Notes: {n}"));
            NewNotification::new(
                NotificationKind::GmApplicationRejected,
                "GM application update",
                format!("Your GM application was not approved.{reason}"),
            )
            .actor(actor.id)
        };
        self.notifier.notify(user.id, &note).await;
        Ok(UserProfile::private(&user))
    }

    pub async fn list_games(
        &self,
        actor: &Actor,
        status: Option<GameStatus>,
        search: Option<String>,
        page: Page,
    ) -> DomainResult<Listing<Game>> {
        require_admin(actor)?;
        let filter = GameFilter { status, search: search.filter(|s| !s.trim().is_empty()), ..Default::default() };
        let total = self.games.count(filter.clone()).await?;
        let items = self.games.list(filter, page).await?;
        Ok(Listing::new(items, total, page))
    }

    /// Removes a game for moderation reasons: voids its bookings, deletes
    /// it, and tells the GM (high priority) and every booked player.
    pub async fn delete_game(&self, actor: &Actor, game_id: Uuid, reason: &str) -> DomainResult<DeletedGame> {
        require_admin(actor)?;
        let reason = validate::text("reason", reason, 500)?;
        let game = self
            .games
            .find_by_id(game_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Game", game_id))?;

        let players = self.game_service.void_bookings(game.id).await?;
        self.games.delete(game.id).await?;
        tracing::warn!(admin_id = %actor.id, %game_id, %reason, "game deleted by admin");

        let to_gm = NewNotification::new(
            NotificationKind::GameDeleted,
            "Your game was removed",
            format!("\"{}\" was removed by an administrator. Reason: {reason}", game.title),
        )
        .actor(actor.id)
        .related(game.id)
        .priority(NotificationPriority::High);
        self.notifier.notify(game.gm_id, &to_gm).await;

        let to_players = NewNotification::new(
            NotificationKind::GameCancelled,
            "Game cancelled",
            format!("\"{}\" was cancelled and your booking has been voided", game.title),
        )
        .related(game.id)
        .link("/bookings");
        self.notifier.fan_out(players.iter().copied(), &to_players).await;

        Ok(DeletedGame { game_id: game.id, cancelled_bookings: players.len() })
    }

    /// Sends a system announcement to every active user in the audience.
    /// Returns how many notifications were created.
    pub async fn broadcast(&self, actor: &Actor, title: &str, message: &str, audience: Audience) -> DomainResult<u64> {
        require_admin(actor)?;
        let title = validate::text("title", title, 120)?;
        let message = validate::text("message", message, 2000)?;
        let filter = UserFilter { role: audience.role(), active_only: true, ..Default::default() };
        let recipients = collect_user_ids(self.users.as_ref(), filter).await?;
        let note = NewNotification::new(NotificationKind::Announcement, title, message).actor(actor.id);
        let sent = self.notifier.fan_out(recipients, &note).await;
        tracing::info!(admin_id = %actor.id, ?audience, sent, "broadcast sent");
        Ok(sent)
    }

    async fn find_user(&self, id: Uuid) -> DomainResult<User> {
        self.users.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("User", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use domains::{BookingStatus, NotificationFilter};

    #[tokio::test]
    async fn non_admins_are_forbidden() {
        let h = Harness::new();
        let gm = h.user("dan", Role::Gm).await;
        let game = h.game(&gm, 4, 0, 48).await;
        let player = h.user("kate", Role::Player).await;

        assert!(matches!(h.services.admin.stats(&gm).await, Err(DomainError::Forbidden(_))));
        let delete = h.services.admin.delete_game(&gm, game.id, "spam").await;
        assert!(matches!(delete, Err(DomainError::Forbidden(_))));
        let approve = h.services.admin.review_gm_application(&gm, player.id, true, None).await;
        assert!(matches!(approve, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn approving_application_promotes_and_notifies() {
        let h = Harness::new();
        let admin = h.user("root", Role::Admin).await;
        let player = h.user("kate", Role::Player).await;
        h.services.auth.apply_gm(&player, "Years of Pathfinder", vec!["Pathfinder 2e".into()]).await.unwrap();

        let pending = h.services.admin.list_gm_applications(&admin, Page::default()).await.unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(pending.items[0].application.systems, vec!["Pathfinder 2e".to_string()]);

        let profile = h.services.admin.review_gm_application(&admin, player.id, true, None).await.unwrap();
        assert_eq!(profile.role, Role::Gm);
        assert_eq!(profile.gm_application_status, ApplicationStatus::Approved);

        let again = h.services.admin.review_gm_application(&admin, player.id, false, None).await;
        assert!(matches!(again, Err(DomainError::Conflict(_))));

        let notes = h.services.notifications.list(&player, NotificationFilter::default(), Page::default()).await.unwrap();
        assert_eq!(notes[0].kind, NotificationKind::GmApplicationApproved);
    }

    #[tokio::test]
    async fn rejecting_keeps_player_role() {
        let h = Harness::new();
        let admin = h.user("root", Role::Admin).await;
        let player = h.user("kate", Role::Player).await;
        h.services.auth.apply_gm(&player, "New to GMing", vec!["Fate".into()]).await.unwrap();
        let profile = h
            .services
            .admin
            .review_gm_application(&admin, player.id, false, Some("Run a few one-shots first".into()))
            .await
            .unwrap();
        assert_eq!(profile.role, Role::Player);
        let stored = h.load(player.id).await;
        assert_eq!(stored.gm_application.reviewed_by, Some(admin.id));
        assert_eq!(stored.gm_application.reviewer_notes.as_deref(), Some("Run a few one-shots first"));
    }

    #[tokio::test]
    async fn delete_game_voids_bookings_and_notifies_everyone() {
        let h = Harness::new();
        let admin = h.user("root", Role::Admin).await;
        let gm = h.user("dan", Role::Gm).await;
        let player = h.user("kate", Role::Player).await;
        let game = h.game(&gm, 4, 0, 48).await;
        let booking = h.services.bookings.book(&player, game.id, 1).await.unwrap();

        let deleted = h.services.admin.delete_game(&admin, game.id, "Inappropriate content").await.unwrap();
        assert_eq!(deleted.cancelled_bookings, 1);
        assert!(matches!(h.services.games.get(game.id).await, Err(DomainError::NotFound { .. })));
        let stored = h.ports.bookings.find_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);

        let gm_notes = h.services.notifications.list(&gm, NotificationFilter::default(), Page::default()).await.unwrap();
        let removed = gm_notes.iter().find(|n| n.kind == NotificationKind::GameDeleted).unwrap();
        assert_eq!(removed.priority, NotificationPriority::High);
        let player_notes = h
            .services
            .notifications
            .list(&player, NotificationFilter::default(), Page::default())
            .await
            .unwrap();
        assert!(player_notes.iter().any(|n| n.kind == NotificationKind::GameCancelled));
    }

    #[tokio::test]
    async fn admins_cannot_deactivate_themselves() {
        let h = Harness::new();
        let admin = h.user("root", Role::Admin).await;
        let player = h.user("kate", Role::Player).await;
        let me = h.services.admin.set_user_active(&admin, admin.id, false).await;
        assert!(matches!(me, Err(DomainError::Validation(_))));
        let profile = h.services.admin.set_user_active(&admin, player.id, false).await.unwrap();
        assert!(!profile.is_active);

        let stats = h.services.admin.stats(&admin).await.unwrap();
        assert_eq!(stats.users, 2);
        assert_eq!(stats.inactive_users, 1);
    }

    #[tokio::test]
    async fn broadcast_targets_audience() {
        let h = Harness::new();
        let admin = h.user("root", Role::Admin).await;
        h.user("dan", Role::Gm).await;
        h.user("kate", Role::Player).await;
        h.user("ben", Role::Player).await;

        assert_eq!(h.services.admin.broadcast(&admin, "Hi", "Players only", Audience::Players).await.unwrap(), 2);
        assert_eq!(h.services.admin.broadcast(&admin, "Hi", "Everyone", Audience::All).await.unwrap(), 4);
    }
}
