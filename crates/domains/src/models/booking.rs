use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum! {
    pub enum BookingStatus {
        /// Seats are held, payment outstanding
        Pending => "pending",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
    }
}

text_enum! {
    pub enum PaymentStatus {
        Unpaid => "unpaid",
        Paid => "paid",
        Refunded => "refunded",
    }
}

/// A player's seat reservation on a game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub seats: i32,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(game_id: Uuid, player_id: Uuid, seats: i32, unit_price_cents: i64) -> Self {
        let now = Utc::now();
        let total_cents = unit_price_cents * i64::from(seats);
        Self {
            id: Uuid::now_v7(),
            game_id,
            player_id,
            seats,
            // Free sessions need no payment step.
            status: if total_cents == 0 { BookingStatus::Confirmed } else { BookingStatus::Pending },
            payment_status: PaymentStatus::Unpaid,
            payment_intent_id: None,
            total_cents,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        }
    }

    /// Pending and confirmed bookings hold seats.
    pub fn is_active(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }

    /// Marks the booking cancelled. Returns true when a refund was issued.
    pub fn cancel(&mut self, refundable: bool) -> bool {
        let now = Utc::now();
        self.status = BookingStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        if refundable && self.payment_status == PaymentStatus::Paid {
            self.payment_status = PaymentStatus::Refunded;
            true
        } else {
            false
        }
    }
}
