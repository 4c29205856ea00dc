//! In-memory repositories.
//!
//! Each repository owns its `DashMap`s. Uniqueness constraints are held in
//! secondary index maps claimed through the entry API, so two concurrent
//! inserts of the same key cannot both succeed.

mod bookings;
mod favorites;
mod games;
mod messaging;
mod notifications;
mod reviews;
mod social;
mod users;

pub use bookings::MemoryBookingRepo;
pub use favorites::MemoryFavoriteRepo;
pub use games::MemoryGameRepo;
pub use messaging::{MemoryConversationRepo, MemoryMessageRepo};
pub use notifications::MemoryNotificationRepo;
pub use reviews::MemoryReviewRepo;
pub use social::MemoryFriendRepo;
pub use users::MemoryUserRepo;

use dashmap::{mapref::entry::Entry, DashMap};
use std::hash::Hash;

/// Claims `key` in a unique index, or reports who holds it.
fn claim<K: Eq + Hash, V: Copy>(index: &DashMap<K, V>, key: K, owner: V) -> Result<(), V> {
    match index.entry(key) {
        Entry::Occupied(e) => Err(*e.get()),
        Entry::Vacant(e) => {
            e.insert(owner);
            Ok(())
        }
    }
}
