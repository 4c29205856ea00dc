use async_trait::async_trait;
use dashmap::DashMap;
use domains::{DomainError, DomainResult, Page, User, UserFilter, UserRepository};
use uuid::Uuid;

use super::claim;

#[derive(Default)]
pub struct MemoryUserRepo {
    users: DashMap<Uuid, User>,
    by_email: DashMap<String, Uuid>,
    by_username: DashMap<String, Uuid>,
    by_referral: DashMap<String, Uuid>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(&self, filter: &UserFilter) -> Vec<User> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| filter.matches(u.value()))
            .map(|u| u.value().clone())
            .collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        users
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepo {
    async fn insert(&self, user: User) -> DomainResult<User> {
        let email = user.email.to_lowercase();
        let username = user.username.to_lowercase();

        claim(&self.by_email, email.clone(), user.id)
            .map_err(|_| DomainError::conflict("email is already registered"))?;
        if claim(&self.by_username, username.clone(), user.id).is_err() {
            self.by_email.remove(&email);
            return Err(DomainError::conflict("username is taken"));
        }
        if claim(&self.by_referral, user.referral_code.clone(), user.id).is_err() {
            self.by_email.remove(&email);
            self.by_username.remove(&username);
            return Err(DomainError::conflict("referral code collision"));
        }

        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let id = self.by_email.get(&email.to_lowercase()).map(|e| *e.value());
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.value().clone())))
    }

    async fn find_by_referral_code(&self, code: &str) -> DomainResult<Option<User>> {
        let id = self.by_referral.get(code).map(|e| *e.value());
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.value().clone())))
    }

    async fn find_many(&self, ids: Vec<Uuid>) -> DomainResult<Vec<User>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect())
    }

    /// Username, email and referral code are immutable after registration.
    async fn update(&self, user: User) -> DomainResult<User> {
        match self.users.get_mut(&user.id) {
            Some(mut stored) => {
                *stored = User {
                    username: stored.username.clone(),
                    email: stored.email.clone(),
                    referral_code: stored.referral_code.clone(),
                    ..user
                };
                Ok(stored.clone())
            }
            None => Err(DomainError::not_found("User", user.id)),
        }
    }

    async fn list(&self, filter: UserFilter, page: Page) -> DomainResult<Vec<User>> {
        Ok(page.apply(self.sorted(&filter)))
    }

    async fn count(&self, filter: UserFilter) -> DomainResult<u64> {
        Ok(self.users.iter().filter(|u| filter.matches(u.value())).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::Role;

    fn user(name: &str, email: &str, code: &str) -> User {
        User::new(name.into(), email.into(), "hash".into(), name.into(), code.into())
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict_and_releases_nothing() {
        let repo = MemoryUserRepo::new();
        repo.insert(user("alice", "a@x.io", "AAAA1111")).await.unwrap();

        let err = repo.insert(user("alice2", "A@X.IO", "BBBB2222")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // The second attempt must not have claimed its username or code.
        repo.insert(user("alice2", "b@x.io", "BBBB2222")).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_username_rolls_back_email_claim() {
        let repo = MemoryUserRepo::new();
        repo.insert(user("bob", "bob@x.io", "AAAA1111")).await.unwrap();
        assert!(repo.insert(user("BOB", "other@x.io", "CCCC3333")).await.is_err());
        assert!(repo.find_by_email("other@x.io").await.unwrap().is_none());
        repo.insert(user("carol", "other@x.io", "CCCC3333")).await.unwrap();
    }

    #[tokio::test]
    async fn update_keeps_identity_fields() {
        let repo = MemoryUserRepo::new();
        let mut stored = repo.insert(user("dana", "dana@x.io", "DDDD4444")).await.unwrap();
        stored.email = "hijack@x.io".into();
        stored.role = Role::Gm;
        let updated = repo.update(stored).await.unwrap();
        assert_eq!(updated.email, "dana@x.io");
        assert_eq!(updated.role, Role::Gm);
    }

    #[tokio::test]
    async fn list_filters_by_role() {
        let repo = MemoryUserRepo::new();
        let mut gm = user("gm", "gm@x.io", "EEEE5555");
        gm.role = Role::Gm;
        repo.insert(gm).await.unwrap();
        repo.insert(user("pc", "pc@x.io", "FFFF6666")).await.unwrap();

        let filter = UserFilter { role: Some(Role::Gm), ..Default::default() };
        let gms = repo.list(filter.clone(), Page::default()).await.unwrap();
        assert_eq!(gms.len(), 1);
        assert_eq!(repo.count(filter).await.unwrap(), 1);
    }
}
