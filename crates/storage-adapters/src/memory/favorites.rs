use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use domains::{DomainError, DomainResult, Favorite, FavoriteRepository};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryFavoriteRepo {
    /// Keyed by (user, GM), which is also the uniqueness constraint
    favorites: DashMap<(Uuid, Uuid), Favorite>,
}

impl MemoryFavoriteRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FavoriteRepository for MemoryFavoriteRepo {
    async fn insert(&self, favorite: Favorite) -> DomainResult<Favorite> {
        match self.favorites.entry((favorite.user_id, favorite.gm_id)) {
            Entry::Occupied(_) => Err(DomainError::conflict("GM is already in your favorites")),
            Entry::Vacant(e) => {
                e.insert(favorite.clone());
                Ok(favorite)
            }
        }
    }

    async fn delete(&self, user_id: Uuid, gm_id: Uuid) -> DomainResult<bool> {
        Ok(self.favorites.remove(&(user_id, gm_id)).is_some())
    }

    async fn list_by_user(&self, user_id: Uuid) -> DomainResult<Vec<Favorite>> {
        let mut favorites: Vec<Favorite> = self
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .map(|f| f.value().clone())
            .collect();
        favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(favorites)
    }
}
