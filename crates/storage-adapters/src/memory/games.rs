use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use domains::{DomainError, DomainResult, Game, GameFilter, GameRepository, GameStatus, Page};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryGameRepo {
    games: DashMap<Uuid, Game>,
}

impl MemoryGameRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameRepository for MemoryGameRepo {
    async fn insert(&self, game: Game) -> DomainResult<Game> {
        self.games.insert(game.id, game.clone());
        Ok(game)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Game>> {
        Ok(self.games.get(&id).map(|g| g.value().clone()))
    }

    async fn update(&self, game: Game) -> DomainResult<Game> {
        let mut stored = self
            .games
            .get_mut(&game.id)
            .ok_or_else(|| DomainError::not_found("Game", game.id))?;
        // Seats may have been booked since the caller read the game.
        let booked_seats = stored.booked_seats;
        if game.capacity < booked_seats {
            return Err(DomainError::conflict("capacity cannot drop below booked seats"));
        }
        *stored = Game { booked_seats, ..game };
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        Ok(self.games.remove(&id).is_some())
    }

    async fn list(&self, filter: GameFilter, page: Page) -> DomainResult<Vec<Game>> {
        let mut games: Vec<Game> = self
            .games
            .iter()
            .filter(|g| filter.matches(g.value()))
            .map(|g| g.value().clone())
            .collect();
        games.sort_by_key(|g| (g.scheduled_at, g.id));
        Ok(page.apply(games))
    }

    async fn count(&self, filter: GameFilter) -> DomainResult<u64> {
        Ok(self.games.iter().filter(|g| filter.matches(g.value())).count() as u64)
    }

    async fn reserve_seats(&self, id: Uuid, seats: i32) -> DomainResult<Option<Game>> {
        // The shard write lock held by `get_mut` makes check-and-add atomic.
        let mut game = self.games.get_mut(&id).ok_or_else(|| DomainError::not_found("Game", id))?;
        if game.status != GameStatus::Scheduled || game.booked_seats + seats > game.capacity {
            return Ok(None);
        }
        game.booked_seats += seats;
        game.updated_at = Utc::now();
        Ok(Some(game.clone()))
    }

    async fn release_seats(&self, id: Uuid, seats: i32) -> DomainResult<()> {
        if let Some(mut game) = self.games.get_mut(&id) {
            game.booked_seats = (game.booked_seats - seats).max(0);
            game.updated_at = Utc::now();
        }
        Ok(())
    }
}
