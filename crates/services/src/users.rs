use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use domains::{
    Actor, DomainError, DomainResult, Favorite, FavoriteRepository, Page, ProfileUpdate, Review, ReviewRepository,
    Role, User, UserFilter, UserProfile, UserRepository,
};
use uuid::Uuid;

use crate::validate;

/// Pages through every user matching `filter` and returns their ids.
pub(crate) async fn collect_user_ids(users: &dyn UserRepository, filter: UserFilter) -> DomainResult<Vec<Uuid>> {
    let mut ids = Vec::new();
    let mut offset = 0;
    loop {
        let page = Page::new(Some(Page::MAX_LIMIT), Some(offset));
        let batch = users.list(filter.clone(), page).await?;
        let fetched = batch.len() as u32;
        ids.extend(batch.into_iter().map(|u| u.id));
        if fetched < page.limit {
            return Ok(ids);
        }
        offset += fetched;
    }
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    favorites: Arc<dyn FavoriteRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        favorites: Arc<dyn FavoriteRepository>,
        reviews: Arc<dyn ReviewRepository>,
    ) -> Self {
        Self { users, favorites, reviews }
    }

    pub async fn profile(&self, viewer: Option<&Actor>, id: Uuid) -> DomainResult<UserProfile> {
        let user = self.find(id).await?;
        Ok(UserProfile::for_viewer(&user, viewer))
    }

    pub async fn update_profile(&self, actor: &Actor, update: ProfileUpdate) -> DomainResult<UserProfile> {
        let mut user = self.find(actor.id).await?;
        if let Some(name) = update.display_name.as_deref() {
            user.display_name = validate::text("display name", name, 50)?;
        }
        if let Some(bio) = update.bio.as_deref() {
            user.bio = validate::optional_text("bio", Some(bio), 1000)?;
        }
        if let Some(url) = update.avatar_url.as_deref() {
            user.avatar_url = validate::optional_text("avatar URL", Some(url), 500)?;
        }
        if let Some(preferences) = update.preferences {
            user.preferences = preferences;
        }
        if let Some(pricing) = update.pricing {
            if !user.can_host() {
                return Err(DomainError::forbidden("only GMs can set pricing"));
            }
            if pricing.per_session_cents < 0 {
                return Err(DomainError::validation("price cannot be negative"));
            }
            user.pricing = Some(pricing);
        }
        user.updated_at = Utc::now();
        let user = self.users.update(user).await?;
        Ok(UserProfile::private(&user))
    }

    /// Active, approved GMs, optionally narrowed by system or name.
    pub async fn list_gms(
        &self,
        system: Option<String>,
        search: Option<String>,
        page: Page,
    ) -> DomainResult<crate::Listing<UserProfile>> {
        let filter = UserFilter {
            role: Some(Role::Gm),
            system: system.filter(|s| !s.trim().is_empty()),
            search: search.filter(|s| !s.trim().is_empty()),
            active_only: true,
            ..Default::default()
        };
        let total = self.users.count(filter.clone()).await?;
        let items = self.users.list(filter, page).await?;
        Ok(crate::Listing::new(items, total, page).map(|u| UserProfile::public(&u)))
    }

    pub async fn search(&self, actor: &Actor, query: &str, page: Page) -> DomainResult<Vec<UserProfile>> {
        let query = validate::text("search query", query, 100)?;
        let filter = UserFilter {
            search: Some(query),
            exclude: Some(actor.id),
            active_only: true,
            ..Default::default()
        };
        let users = self.users.list(filter, page).await?;
        Ok(users.iter().map(UserProfile::public).collect())
    }

    pub async fn add_favorite(&self, actor: &Actor, gm_id: Uuid) -> DomainResult<Favorite> {
        if gm_id == actor.id {
            return Err(DomainError::validation("you cannot favorite yourself"));
        }
        let gm = self.find(gm_id).await?;
        if gm.role != Role::Gm {
            return Err(DomainError::validation("only GMs can be favorited"));
        }
        self.favorites.insert(Favorite::new(actor.id, gm_id)).await
    }

    pub async fn remove_favorite(&self, actor: &Actor, gm_id: Uuid) -> DomainResult<()> {
        if self.favorites.delete(actor.id, gm_id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found("Favorite", gm_id))
        }
    }

    /// Favorited GMs, most recently added first. GMs that no longer exist
    /// are skipped.
    pub async fn list_favorites(&self, actor: &Actor) -> DomainResult<Vec<UserProfile>> {
        let favorites = self.favorites.list_by_user(actor.id).await?;
        let ids: Vec<Uuid> = favorites.iter().map(|f| f.gm_id).collect();
        let by_id: HashMap<Uuid, User> = self.users.find_many(ids).await?.into_iter().map(|u| (u.id, u)).collect();
        Ok(favorites
            .iter()
            .filter_map(|f| by_id.get(&f.gm_id))
            .map(UserProfile::public)
            .collect())
    }

    pub async fn list_gm_reviews(&self, gm_id: Uuid, page: Page) -> DomainResult<Vec<Review>> {
        self.find(gm_id).await?;
        self.reviews.list_by_gm(gm_id, page).await
    }

    async fn find(&self, id: Uuid) -> DomainResult<User> {
        self.users.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("User", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use domains::GmPricing;

    #[tokio::test]
    async fn favorites_are_unique_and_gm_only() {
        let h = Harness::new();
        let player = h.user("kate", Role::Player).await;
        let gm = h.user("dungeon_dan", Role::Gm).await;
        let other_player = h.user("ben", Role::Player).await;

        h.services.users.add_favorite(&player, gm.id).await.unwrap();
        let dup = h.services.users.add_favorite(&player, gm.id).await;
        assert!(matches!(dup, Err(DomainError::Conflict(_))));
        let not_gm = h.services.users.add_favorite(&player, other_player.id).await;
        assert!(matches!(not_gm, Err(DomainError::Validation(_))));

        let favorites = h.services.users.list_favorites(&player).await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, gm.id);

        h.services.users.remove_favorite(&player, gm.id).await.unwrap();
        let gone = h.services.users.remove_favorite(&player, gm.id).await;
        assert!(matches!(gone, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn only_gms_set_pricing() {
        let h = Harness::new();
        let player = h.user("kate", Role::Player).await;
        let gm = h.user("dan", Role::Gm).await;
        let pricing = GmPricing { per_session_cents: 1500, currency: "USD".into() };
        let update = ProfileUpdate { pricing: Some(pricing.clone()), ..Default::default() };

        let err = h.services.users.update_profile(&player, update.clone()).await;
        assert!(matches!(err, Err(DomainError::Forbidden(_))));
        let profile = h.services.users.update_profile(&gm, update).await.unwrap();
        assert_eq!(profile.pricing, Some(pricing));
    }

    #[tokio::test]
    async fn search_excludes_caller() {
        let h = Harness::new();
        let kate = h.user("kate", Role::Player).await;
        h.user("katherine", Role::Player).await;
        let found = h.services.users.search(&kate, "kat", Page::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "katherine");
        assert!(found[0].email.is_none());
    }

    #[tokio::test]
    async fn collect_user_ids_walks_every_page() {
        let h = Harness::new();
        for i in 0..(Page::MAX_LIMIT + 5) {
            h.user(&format!("player{i}"), Role::Player).await;
        }
        let ids = collect_user_ids(h.ports.users.as_ref(), UserFilter::default()).await.unwrap();
        assert_eq!(ids.len() as u32, Page::MAX_LIMIT + 5);
    }
}
