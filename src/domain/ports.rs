use std::collections::HashMap;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::errors::DomainError;
use super::listing::{Listing, ListingChanges, ListingFilter, ListingStatus};
use super::order::Order;
use super::user::User;

/// Builds the order to commit from the locked listings it references.
/// Listings that do not exist are absent from the map.
pub type OrderPlan<'a> = &'a dyn Fn(&HashMap<Uuid, Listing>) -> Result<Order, DomainError>;

pub trait CatalogStore: Send + Sync + 'static {
    fn insert(&self, listing: Listing) -> Result<Listing, DomainError>;
    fn get(&self, id: Uuid) -> Result<Option<Listing>, DomainError>;
    fn list(&self, filter: &ListingFilter) -> Result<Vec<Listing>, DomainError>;
    fn update(&self, id: Uuid, changes: ListingChanges) -> Result<Option<Listing>, DomainError>;
    fn set_status(&self, id: Uuid, status: ListingStatus)
        -> Result<Option<Listing>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;

    /// Atomically subtracts `amount` from the listing's quantity. Returns
    /// `Ok(false)` without touching anything when `amount` exceeds it.
    fn compare_and_decrement(&self, id: Uuid, amount: &BigDecimal) -> Result<bool, DomainError>;
}

pub trait OrderStore: Send + Sync + 'static {
    /// Locks every listing in `listing_ids` in ascending id order, runs
    /// `plan` against the locked state, then decrements each line's listing
    /// and records the order and its `OrderPlaced` event as one unit. If
    /// `plan` or any write fails, nothing is changed.
    fn commit(&self, listing_ids: &[Uuid], plan: OrderPlan<'_>) -> Result<Order, DomainError>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;

    /// Orders placed by `buyer_id`, oldest first.
    fn list_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>, DomainError>;

    /// Complete orders with at least one line sold by `farmer_id`, oldest
    /// first. Callers project them before exposing them to the farmer.
    fn list_touching_farmer(&self, farmer_id: Uuid) -> Result<Vec<Order>, DomainError>;

    fn list_all(&self) -> Result<Vec<Order>, DomainError>;
}

pub trait UserDirectory: Send + Sync + 'static {
    fn insert(&self, user: User) -> Result<User, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;
    fn list(&self) -> Result<Vec<User>, DomainError>;
    fn set_approved(&self, id: Uuid, approved: bool) -> Result<Option<User>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}
