use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use domains::{DomainResult, Notification, NotificationFilter, NotificationRepository, Page};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryNotificationRepo {
    notifications: DashMap<Uuid, Notification>,
}

impl MemoryNotificationRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepo {
    async fn insert_many(&self, notifications: Vec<Notification>) -> DomainResult<u64> {
        let count = notifications.len() as u64;
        for n in notifications {
            self.notifications.insert(n.id, n);
        }
        Ok(count)
    }

    async fn list(&self, user_id: Uuid, filter: NotificationFilter, page: Page) -> DomainResult<Vec<Notification>> {
        let mut items: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && filter.matches(n.value()))
            .map(|n| n.value().clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page.apply(items))
    }

    async fn count_unread(&self, user_id: Uuid) -> DomainResult<u64> {
        Ok(self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> DomainResult<Option<Notification>> {
        match self.notifications.get_mut(&id) {
            Some(mut n) if n.user_id == user_id => {
                if !n.is_read {
                    n.is_read = true;
                    n.read_at = Some(Utc::now());
                }
                Ok(Some(n.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid) -> DomainResult<u64> {
        let now = Utc::now();
        let mut changed = 0;
        for mut n in self.notifications.iter_mut() {
            if n.user_id == user_id && !n.is_read {
                n.is_read = true;
                n.read_at = Some(now);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> DomainResult<bool> {
        Ok(self.notifications.remove_if(&id, |_, n| n.user_id == user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{NewNotification, NotificationKind};

    #[tokio::test]
    async fn recipients_only_touch_their_own_notifications() {
        let repo = MemoryNotificationRepo::new();
        let (alice, mallory) = (Uuid::now_v7(), Uuid::now_v7());
        let n = NewNotification::new(NotificationKind::Announcement, "Hi", "Welcome").for_user(alice);
        let id = n.id;
        repo.insert_many(vec![n]).await.unwrap();

        assert!(repo.mark_read(id, mallory).await.unwrap().is_none());
        assert!(!repo.delete(id, mallory).await.unwrap());
        assert_eq!(repo.count_unread(alice).await.unwrap(), 1);

        assert!(repo.mark_read(id, alice).await.unwrap().unwrap().is_read);
        assert_eq!(repo.count_unread(alice).await.unwrap(), 0);
        assert!(repo.delete(id, alice).await.unwrap());
    }
}
