use std::sync::Arc;

use chrono::Utc;
use domains::{
    Actor, Booking, BookingRepository, DomainError, DomainResult, Game, GameRepository, NewNotification,
    NotificationKind, Page,
};
use uuid::Uuid;

use crate::notifications::NotificationService;

#[derive(Clone)]
pub struct BookingService {
    games: Arc<dyn GameRepository>,
    bookings: Arc<dyn BookingRepository>,
    notifier: NotificationService,
}

impl BookingService {
    pub fn new(
        games: Arc<dyn GameRepository>,
        bookings: Arc<dyn BookingRepository>,
        notifier: NotificationService,
    ) -> Self {
        Self { games, bookings, notifier }
    }

    /// Reserves seats atomically, then records the booking. If recording
    /// fails the seats are handed back.
    pub async fn book(&self, actor: &Actor, game_id: Uuid, seats: i32) -> DomainResult<Booking> {
        if !(1..=Game::MAX_CAPACITY).contains(&seats) {
            return Err(DomainError::validation("seats must be between 1 and 20"));
        }
        let game = self.find_game(game_id).await?;
        if game.gm_id == actor.id {
            return Err(DomainError::forbidden("you cannot book your own game"));
        }
        if !game.is_bookable(Utc::now()) {
            return Err(DomainError::conflict("this game is no longer open for booking"));
        }
        if self.bookings.find_active(game_id, actor.id).await?.is_some() {
            return Err(DomainError::conflict("you already have a booking for this game"));
        }

        let game = self
            .games
            .reserve_seats(game_id, seats)
            .await?
            .ok_or_else(|| DomainError::conflict("not enough seats available"))?;

        let booking = match self.bookings.insert(Booking::new(game.id, actor.id, seats, game.price_cents)).await {
            Ok(b) => b,
            Err(e) => {
                self.games.release_seats(game.id, seats).await?;
                return Err(e);
            }
        };
        tracing::info!(booking_id = %booking.id, game_id = %game.id, seats, "booking created");

        let note = NewNotification::new(
            NotificationKind::BookingCreated,
            "New booking",
            format!("{seats} seat(s) booked for \"{}\"", game.title),
        )
        .actor(actor.id)
        .related(booking.id)
        .link(format!("/games/{}", game.id));
        self.notifier.notify(game.gm_id, &note).await;
        Ok(booking)
    }

    pub async fn list_mine(&self, actor: &Actor, page: Page) -> DomainResult<Vec<Booking>> {
        self.bookings.list_by_player(actor.id, page).await
    }

    /// Bookings on a game, for its GM or an admin.
    pub async fn list_for_game(&self, actor: &Actor, game_id: Uuid) -> DomainResult<Vec<Booking>> {
        let game = self.find_game(game_id).await?;
        if game.gm_id != actor.id && !actor.is_admin() {
            return Err(DomainError::forbidden("only the hosting GM can see bookings"));
        }
        self.bookings.list_by_game(game_id).await
    }

    /// Cancels the caller's booking. Paid bookings are refunded when the
    /// game's cancellation policy still allows it.
    pub async fn cancel(&self, actor: &Actor, booking_id: Uuid) -> DomainResult<Booking> {
        let mut booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", booking_id))?;
        if booking.player_id != actor.id {
            return Err(DomainError::forbidden("this booking belongs to another player"));
        }
        if !booking.is_active() {
            return Err(DomainError::conflict("booking is already cancelled"));
        }

        let game = self.games.find_by_id(booking.game_id).await?;
        let refundable = game
            .as_ref()
            .map_or(true, |g| g.cancellation_policy.is_refundable(g.scheduled_at, Utc::now()));
        let refunded = booking.cancel(refundable);
        let booking = self.bookings.update(booking).await?;
        self.games.release_seats(booking.game_id, booking.seats).await?;
        tracing::info!(%booking_id, refunded, "booking cancelled");

        if let Some(game) = game {
            let note = NewNotification::new(
                NotificationKind::BookingCancelled,
                "Booking cancelled",
                format!("A player cancelled {} seat(s) for \"{}\"", booking.seats, game.title),
            )
            .actor(actor.id)
            .related(booking.id)
            .link(format!("/games/{}", game.id));
            self.notifier.notify(game.gm_id, &note).await;
        }
        Ok(booking)
    }

    async fn find_game(&self, id: Uuid) -> DomainResult<Game> {
        self.games.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("Game", id))
    }
}
