//! Simulated payments. No money moves; an "intent" is an opaque id stored
//! on the booking and confirmed by echoing it back.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    Actor, Booking, BookingRepository, BookingStatus, DomainError, DomainResult, GameRepository, NewNotification,
    NotificationKind, Page, PaymentStatus,
};
use serde::Serialize;
use uuid::Uuid;

use crate::notifications::NotificationService;

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub booking_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Clone)]
pub struct PaymentService {
    bookings: Arc<dyn BookingRepository>,
    games: Arc<dyn GameRepository>,
    notifier: NotificationService,
}

impl PaymentService {
    pub fn new(bookings: Arc<dyn BookingRepository>, games: Arc<dyn GameRepository>, notifier: NotificationService) -> Self {
        Self { bookings, games, notifier }
    }

    pub async fn create_intent(&self, actor: &Actor, booking_id: Uuid) -> DomainResult<PaymentIntent> {
        let mut booking = self.payable(actor, booking_id).await?;
        let currency = match self.games.find_by_id(booking.game_id).await? {
            Some(game) => game.currency,
            None => return Err(DomainError::conflict("the game for this booking no longer exists")),
        };

        let id = format!("pi_sim_{}", Uuid::new_v4().simple());
        let client_secret = format!("{id}_secret_{}", Uuid::new_v4().simple());
        booking.payment_intent_id = Some(id.clone());
        booking.updated_at = Utc::now();
        let booking = self.bookings.update(booking).await?;
        tracing::info!(%booking_id, intent = %id, amount = booking.total_cents, "payment intent created");

        Ok(PaymentIntent { id, client_secret, booking_id, amount_cents: booking.total_cents, currency })
    }

    pub async fn confirm(&self, actor: &Actor, booking_id: Uuid, intent_id: &str) -> DomainResult<Booking> {
        let mut booking = self.payable(actor, booking_id).await?;
        if booking.payment_intent_id.as_deref() != Some(intent_id) {
            return Err(DomainError::validation("payment intent does not match this booking"));
        }
        booking.status = BookingStatus::Confirmed;
        booking.payment_status = PaymentStatus::Paid;
        booking.updated_at = Utc::now();
        let booking = self.bookings.update(booking).await?;
        tracing::info!(%booking_id, "payment confirmed");

        if let Some(game) = self.games.find_by_id(booking.game_id).await? {
            let note = NewNotification::new(
                NotificationKind::PaymentReceived,
                "Payment received",
                format!(
                    "Payment of {}.{:02} {} received for \"{}\"",
                    booking.total_cents / 100,
                    booking.total_cents % 100,
                    game.currency,
                    game.title
                ),
            )
            .actor(actor.id)
            .related(booking.id);
            self.notifier.notify(game.gm_id, &note).await;
        }
        Ok(booking)
    }

    /// The caller's paid and refunded bookings, newest first.
    pub async fn history(&self, actor: &Actor, page: Page) -> DomainResult<Vec<Booking>> {
        let mut paid = Vec::new();
        let mut offset = 0;
        loop {
            let batch_page = Page::new(Some(Page::MAX_LIMIT), Some(offset));
            let batch = self.bookings.list_by_player(actor.id, batch_page).await?;
            let fetched = batch.len() as u32;
            paid.extend(batch.into_iter().filter(|b| b.payment_status != PaymentStatus::Unpaid));
            if fetched < batch_page.limit {
                break;
            }
            offset += fetched;
        }
        Ok(page.apply(paid))
    }

    async fn payable(&self, actor: &Actor, booking_id: Uuid) -> DomainResult<Booking> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", booking_id))?;
        if booking.player_id != actor.id {
            return Err(DomainError::forbidden("this booking belongs to another player"));
        }
        if booking.status != BookingStatus::Pending || booking.payment_status != PaymentStatus::Unpaid {
            return Err(DomainError::conflict("this booking does not need payment"));
        }
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use domains::Role;

    #[tokio::test]
    async fn intent_then_confirm_marks_booking_paid() {
        let h = Harness::new();
        let gm = h.user("dan", Role::Gm).await;
        let player = h.user("kate", Role::Player).await;
        let game = h.game(&gm, 4, 1250, 48).await;
        let booking = h.services.bookings.book(&player, game.id, 2).await.unwrap();

        let intent = h.services.payments.create_intent(&player, booking.id).await.unwrap();
        assert_eq!(intent.amount_cents, 2500);
        assert!(intent.client_secret.starts_with(&intent.id));

        let wrong = h.services.payments.confirm(&player, booking.id, "pi_sim_other").await;
        assert!(matches!(wrong, Err(DomainError::Validation(_))));

        let paid = h.services.payments.confirm(&player, booking.id, &intent.id).await.unwrap();
        assert_eq!(paid.status, BookingStatus::Confirmed);
        assert_eq!(paid.payment_status, PaymentStatus::Paid);

        let twice = h.services.payments.confirm(&player, booking.id, &intent.id).await;
        assert!(matches!(twice, Err(DomainError::Conflict(_))));

        let history = h.services.payments.history(&player, Page::default()).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn free_and_foreign_bookings_are_not_payable() {
        let h = Harness::new();
        let gm = h.user("dan", Role::Gm).await;
        let player = h.user("kate", Role::Player).await;
        let other = h.user("ben", Role::Player).await;
        let free = h.game(&gm, 4, 0, 48).await;
        let paid = h.game(&gm, 4, 500, 48).await;

        let confirmed = h.services.bookings.book(&player, free.id, 1).await.unwrap();
        let err = h.services.payments.create_intent(&player, confirmed.id).await;
        assert!(matches!(err, Err(DomainError::Conflict(_))));

        let pending = h.services.bookings.book(&player, paid.id, 1).await.unwrap();
        let err = h.services.payments.create_intent(&other, pending.id).await;
        assert!(matches!(err, Err(DomainError::Forbidden(_))));
    }
}
