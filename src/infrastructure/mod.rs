pub mod listing_repo;
pub mod memory;
pub mod models;
pub mod order_repo;
pub mod user_repo;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::listing::Listing;
use crate::domain::order::Order;

pub use listing_repo::PgCatalogStore;
pub use memory::InMemoryStore;
pub use order_repo::PgOrderStore;
pub use user_repo::PgUserDirectory;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        // r2d2 only fails a checkout when the connection timeout elapses.
        DomainError::StorageUnavailable(e.to_string())
    }
}

/// Re-checks an order against the locked listings it was planned from and
/// returns each touched listing as it stands once the order is applied.
/// Every line goes through [`Listing::take`], the same guarded decrement the
/// in-memory `compare_and_decrement` uses.
pub(crate) fn verify_plan(
    locked: &HashMap<Uuid, Listing>,
    order: &Order,
) -> Result<HashMap<Uuid, Listing>, DomainError> {
    let mut after: HashMap<Uuid, Listing> = HashMap::new();
    for line in &order.lines {
        let listing = match after.entry(line.listing_id) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let current = locked
                    .get(&line.listing_id)
                    .filter(|l| l.is_purchasable())
                    .ok_or(DomainError::ListingUnavailable(line.listing_id))?;
                e.insert(current.clone())
            }
        };
        if !listing.take(&line.quantity, order.created_at) {
            return Err(DomainError::InsufficientStock {
                listing_id: listing.id,
                name: listing.name.clone(),
                available: listing.quantity.clone(),
                requested: line.quantity.clone(),
            });
        }
    }
    Ok(after)
}
