use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use bigdecimal::BigDecimal;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::listing::{Listing, ListingChanges, ListingFilter, ListingStatus};
use crate::domain::order::{Order, OutboxEvent};
use crate::domain::ports::{CatalogStore, OrderPlan, OrderStore, UserDirectory};
use crate::domain::user::User;

use super::verify_plan;

/// Process-local store. Each listing sits behind its own mutex; multi-listing
/// commits take those mutexes in ascending id order.
#[derive(Default)]
pub struct InMemoryStore {
    listings: DashMap<Uuid, Arc<Mutex<Listing>>>,
    orders: RwLock<Vec<Order>>,
    outbox: Mutex<Vec<OutboxEvent>>,
    users: DashMap<Uuid, User>,
    /// Lowercased email to user id. Claiming an entry here is what makes an
    /// email unique.
    emails: DashMap<String, Uuid>,
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, DomainError> {
    m.lock()
        .map_err(|_| DomainError::Internal("store lock poisoned".to_string()))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded by committed orders, oldest first.
    pub fn outbox(&self) -> Result<Vec<OutboxEvent>, DomainError> {
        Ok(lock(&self.outbox)?.clone())
    }

    fn cell(&self, id: Uuid) -> Option<Arc<Mutex<Listing>>> {
        self.listings.get(&id).map(|e| Arc::clone(e.value()))
    }

    /// False once the listing has been deleted (or replaced) since `cell`
    /// was looked up.
    fn is_live(&self, id: Uuid, cell: &Arc<Mutex<Listing>>) -> bool {
        self.listings
            .get(&id)
            .is_some_and(|e| Arc::ptr_eq(e.value(), cell))
    }

    // Cells are collected before locking so no map shard is held while
    // waiting on a listing mutex.
    fn cells(&self) -> Vec<Arc<Mutex<Listing>>> {
        self.listings.iter().map(|e| Arc::clone(e.value())).collect()
    }

    fn read_orders(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Order>>, DomainError> {
        self.orders
            .read()
            .map_err(|_| DomainError::Internal("order log lock poisoned".to_string()))
    }
}

impl CatalogStore for InMemoryStore {
    fn insert(&self, listing: Listing) -> Result<Listing, DomainError> {
        self.listings
            .insert(listing.id, Arc::new(Mutex::new(listing.clone())));
        Ok(listing)
    }

    fn get(&self, id: Uuid) -> Result<Option<Listing>, DomainError> {
        match self.cell(id) {
            Some(cell) => Ok(Some(lock(&cell)?.clone())),
            None => Ok(None),
        }
    }

    fn list(&self, filter: &ListingFilter) -> Result<Vec<Listing>, DomainError> {
        let mut out = Vec::new();
        for cell in self.cells() {
            let listing = lock(&cell)?;
            if filter.matches(&listing) {
                out.push(listing.clone());
            }
        }
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    fn update(&self, id: Uuid, changes: ListingChanges) -> Result<Option<Listing>, DomainError> {
        let Some(cell) = self.cell(id) else {
            return Ok(None);
        };
        let mut listing = lock(&cell)?;
        listing.apply(changes, Utc::now());
        Ok(Some(listing.clone()))
    }

    fn set_status(
        &self,
        id: Uuid,
        status: ListingStatus,
    ) -> Result<Option<Listing>, DomainError> {
        let Some(cell) = self.cell(id) else {
            return Ok(None);
        };
        let mut listing = lock(&cell)?;
        listing.status = status;
        listing.updated_at = Utc::now();
        Ok(Some(listing.clone()))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        Ok(self.listings.remove(&id).is_some())
    }

    fn compare_and_decrement(&self, id: Uuid, amount: &BigDecimal) -> Result<bool, DomainError> {
        let Some(cell) = self.cell(id) else {
            return Err(DomainError::NotFound("Listing"));
        };
        let mut listing = lock(&cell)?;
        Ok(listing.take(amount, Utc::now()))
    }
}

impl OrderStore for InMemoryStore {
    fn commit(&self, listing_ids: &[Uuid], plan: OrderPlan<'_>) -> Result<Order, DomainError> {
        let mut ids = listing_ids.to_vec();
        ids.sort();
        ids.dedup();

        let cells: Vec<(Uuid, Arc<Mutex<Listing>>)> = ids
            .into_iter()
            .filter_map(|id| self.cell(id).map(|cell| (id, cell)))
            .collect();

        let mut guards = Vec::with_capacity(cells.len());
        for (id, cell) in &cells {
            let guard = lock(cell)?;
            if self.is_live(*id, cell) {
                guards.push(guard);
            }
        }

        let locked: HashMap<Uuid, Listing> =
            guards.iter().map(|g| (g.id, (**g).clone())).collect();
        let order = plan(&locked)?;
        let mut after = verify_plan(&locked, &order)?;

        // Take the log locks before the first mutation so a poisoned lock
        // cannot leave decrements without an order.
        let mut log = self
            .orders
            .write()
            .map_err(|_| DomainError::Internal("order log lock poisoned".to_string()))?;
        let mut outbox = lock(&self.outbox)?;

        for guard in guards.iter_mut() {
            if let Some(listing) = after.remove(&guard.id) {
                **guard = listing;
            }
        }
        outbox.push(OutboxEvent::order_placed(&order));
        log.push(order.clone());
        Ok(order)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.read_orders()?.iter().find(|o| o.id == id).cloned())
    }

    fn list_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>, DomainError> {
        Ok(self
            .read_orders()?
            .iter()
            .filter(|o| o.buyer_id == buyer_id)
            .cloned()
            .collect())
    }

    fn list_touching_farmer(&self, farmer_id: Uuid) -> Result<Vec<Order>, DomainError> {
        Ok(self
            .read_orders()?
            .iter()
            .filter(|o| o.touches_farmer(farmer_id))
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<Order>, DomainError> {
        Ok(self.read_orders()?.clone())
    }
}

impl UserDirectory for InMemoryStore {
    fn insert(&self, user: User) -> Result<User, DomainError> {
        let email = match self.emails.entry(user.email.to_ascii_lowercase()) {
            Entry::Occupied(_) => {
                return Err(DomainError::InvalidInput(format!(
                    "email {} already registered",
                    user.email
                )))
            }
            Entry::Vacant(email) => email,
        };
        match self.users.entry(user.id) {
            Entry::Occupied(_) => Err(DomainError::InvalidInput(format!(
                "user {} already exists",
                user.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                email.insert(user.id);
                Ok(user)
            }
        }
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    fn list(&self) -> Result<Vec<User>, DomainError> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    fn set_approved(&self, id: Uuid, approved: bool) -> Result<Option<User>, DomainError> {
        Ok(self.users.get_mut(&id).map(|mut u| {
            u.approved = approved;
            u.clone()
        }))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        match self.users.remove(&id) {
            Some((_, user)) => {
                self.emails
                    .remove_if(&user.email.to_ascii_lowercase(), |_, owner| *owner == id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
