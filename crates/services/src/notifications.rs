use std::collections::BTreeSet;
use std::sync::Arc;

use domains::{
    Actor, DomainError, DomainResult, NewNotification, Notification, NotificationFilter, NotificationRepository,
    Page,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    /// Best effort: a failed insert is logged, never returned.
    pub async fn notify(&self, user_id: Uuid, template: &NewNotification) {
        self.fan_out([user_id], template).await;
    }

    /// Creates one notification per distinct recipient. Best effort, returns
    /// how many were stored.
    pub async fn fan_out(&self, recipients: impl IntoIterator<Item = Uuid>, template: &NewNotification) -> u64 {
        let recipients: BTreeSet<Uuid> = recipients.into_iter().collect();
        if recipients.is_empty() {
            return 0;
        }
        let batch: Vec<Notification> = recipients.iter().map(|id| template.for_user(*id)).collect();
        match self.repo.insert_many(batch).await {
            Ok(stored) => {
                tracing::debug!(kind = %template.kind, recipients = stored, "notifications created");
                stored
            }
            Err(e) => {
                tracing::warn!(kind = %template.kind, recipients = recipients.len(), error = %e, "failed to create notifications");
                0
            }
        }
    }

    pub async fn list(&self, actor: &Actor, filter: NotificationFilter, page: Page) -> DomainResult<Vec<Notification>> {
        self.repo.list(actor.id, filter, page).await
    }

    pub async fn unread_count(&self, actor: &Actor) -> DomainResult<u64> {
        self.repo.count_unread(actor.id).await
    }

    pub async fn mark_read(&self, actor: &Actor, id: Uuid) -> DomainResult<Notification> {
        self.repo
            .mark_read(id, actor.id)
            .await?
            .ok_or_else(|| DomainError::not_found("Notification", id))
    }

    pub async fn mark_all_read(&self, actor: &Actor) -> DomainResult<u64> {
        self.repo.mark_all_read(actor.id).await
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> DomainResult<()> {
        if self.repo.delete(id, actor.id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found("Notification", id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockNotificationRepository, NotificationKind, Role};
    use storage_adapters::MemoryNotificationRepo;

    fn template() -> NewNotification {
        NewNotification::new(NotificationKind::Announcement, "Maintenance", "Back in five")
    }

    #[tokio::test]
    async fn fan_out_deduplicates_recipients() {
        let service = NotificationService::new(Arc::new(MemoryNotificationRepo::new()));
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        assert_eq!(service.fan_out([a, b, a], &template()).await, 2);
        assert_eq!(service.fan_out(Vec::new(), &template()).await, 0);
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let mut repo = MockNotificationRepository::new();
        repo.expect_insert_many()
            .times(1)
            .returning(|_| Err(DomainError::internal("db down")));
        let service = NotificationService::new(Arc::new(repo));
        assert_eq!(service.fan_out([Uuid::now_v7()], &template()).await, 0);
    }

    #[tokio::test]
    async fn other_users_notifications_are_not_found() {
        let service = NotificationService::new(Arc::new(MemoryNotificationRepo::new()));
        let owner = Actor::new(Uuid::now_v7(), Role::Player);
        let intruder = Actor::new(Uuid::now_v7(), Role::Player);
        service.notify(owner.id, &template()).await;

        let mine = service.list(&owner, NotificationFilter::default(), Page::default()).await.unwrap();
        assert_eq!(mine.len(), 1);
        let id = mine[0].id;

        assert!(matches!(service.mark_read(&intruder, id).await, Err(DomainError::NotFound { .. })));
        assert!(matches!(service.delete(&intruder, id).await, Err(DomainError::NotFound { .. })));

        assert!(service.mark_read(&owner, id).await.unwrap().is_read);
        assert_eq!(service.unread_count(&owner).await.unwrap(), 0);
        service.delete(&owner, id).await.unwrap();
    }
}
