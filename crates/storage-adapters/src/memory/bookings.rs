use async_trait::async_trait;
use dashmap::DashMap;
use domains::{Booking, BookingRepository, DomainError, DomainResult, Page};
use uuid::Uuid;

use super::claim;

#[derive(Default)]
pub struct MemoryBookingRepo {
    bookings: DashMap<Uuid, Booking>,
    /// (game, player) -> booking id, for active bookings only
    active: DashMap<(Uuid, Uuid), Uuid>,
}

impl MemoryBookingRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingRepo {
    async fn insert(&self, booking: Booking) -> DomainResult<Booking> {
        if booking.is_active() {
            claim(&self.active, (booking.game_id, booking.player_id), booking.id)
                .map_err(|_| DomainError::conflict("you already have a booking for this game"))?;
        }
        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|b| b.value().clone()))
    }

    async fn update(&self, booking: Booking) -> DomainResult<Booking> {
        let mut stored = self
            .bookings
            .get_mut(&booking.id)
            .ok_or_else(|| DomainError::not_found("Booking", booking.id))?;
        if !booking.is_active() {
            self.active.remove_if(&(booking.game_id, booking.player_id), |_, id| *id == booking.id);
        }
        *stored = booking;
        Ok(stored.clone())
    }

    async fn list_by_player(&self, player_id: Uuid, page: Page) -> DomainResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.player_id == player_id)
            .map(|b| b.value().clone())
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page.apply(bookings))
    }

    async fn list_by_game(&self, game_id: Uuid) -> DomainResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.game_id == game_id)
            .map(|b| b.value().clone())
            .collect();
        bookings.sort_by_key(|b| (b.created_at, b.id));
        Ok(bookings)
    }

    async fn find_active(&self, game_id: Uuid, player_id: Uuid) -> DomainResult<Option<Booking>> {
        let id = self.active.get(&(game_id, player_id)).map(|e| *e.value());
        Ok(id.and_then(|id| self.bookings.get(&id).map(|b| b.value().clone())))
    }

    async fn count(&self) -> DomainResult<u64> {
        Ok(self.bookings.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn one_active_booking_per_player_and_game() {
        let repo = MemoryBookingRepo::new();
        let (game, player) = (Uuid::now_v7(), Uuid::now_v7());
        let mut first = repo.insert(Booking::new(game, player, 1, 0)).await.unwrap();

        let dup = repo.insert(Booking::new(game, player, 2, 0)).await.unwrap_err();
        assert!(matches!(dup, DomainError::Conflict(_)));

        // Cancelling frees the slot for a fresh booking.
        first.cancel(false);
        repo.update(first).await.unwrap();
        assert!(repo.find_active(game, player).await.unwrap().is_none());
        repo.insert(Booking::new(game, player, 2, 0)).await.unwrap();
    }
}
