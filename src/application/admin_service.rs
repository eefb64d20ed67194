use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::listing::{ListingFilter, ListingStatus};
use crate::domain::ports::{CatalogStore, OrderStore, UserDirectory};
use crate::domain::user::{Role, User};

#[derive(Debug, Clone, PartialEq)]
pub struct Analytics {
    pub total_users: usize,
    pub farmers: usize,
    pub buyers: usize,
    pub pending_users: usize,
    pub total_listings: usize,
    pub active_listings: usize,
    pub pending_listings: usize,
    pub total_orders: usize,
    pub total_sales: BigDecimal,
}

/// The account created at start-up when the directory has no superadmin.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperadminSeed {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

pub struct AdminService {
    users: Arc<dyn UserDirectory>,
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
}

impl AdminService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            users,
            catalog,
            orders,
        }
    }

    pub fn list_users(&self) -> Result<Vec<User>, DomainError> {
        self.users.list()
    }

    pub fn approve_user(&self, id: Uuid) -> Result<User, DomainError> {
        let user = self
            .users
            .set_approved(id, true)?
            .ok_or(DomainError::NotFound("User"))?;
        log::info!("user {} ({}) approved", user.id, user.role);
        Ok(user)
    }

    /// Withdraws approval. The user keeps their account but fails every
    /// approval gate until approved again.
    pub fn reject_user(&self, id: Uuid) -> Result<User, DomainError> {
        let existing = self
            .users
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("User"))?;
        if existing.role == Role::Superadmin {
            return Err(DomainError::forbidden("Cannot reject superadmin"));
        }
        let user = self
            .users
            .set_approved(id, false)?
            .ok_or(DomainError::NotFound("User"))?;
        log::info!("user {} ({}) rejected", user.id, user.role);
        Ok(user)
    }

    /// Creates the seed superadmin unless one already exists. Returns the
    /// created user, or `None` when nothing was inserted.
    pub fn seed_superadmin(&self, seed: &SuperadminSeed) -> Result<Option<User>, DomainError> {
        if self.users.find_by_id(seed.id)?.is_some()
            || self
                .users
                .list()?
                .iter()
                .any(|u| u.role == Role::Superadmin)
        {
            return Ok(None);
        }
        let user = self.users.insert(User {
            id: seed.id,
            name: seed.name.clone(),
            email: seed.email.clone(),
            role: Role::Superadmin,
            approved: true,
            created_at: Utc::now(),
        })?;
        log::info!("seeded superadmin {} <{}>", user.id, user.email);
        Ok(Some(user))
    }

    pub fn remove_user(&self, id: Uuid) -> Result<(), DomainError> {
        let user = self
            .users
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("User"))?;
        if user.role == Role::Superadmin {
            return Err(DomainError::forbidden("Cannot delete superadmin"));
        }
        self.users.delete(id)?;
        log::info!("user {} removed", id);
        Ok(())
    }

    pub fn analytics(&self) -> Result<Analytics, DomainError> {
        let users = self.users.list()?;
        let listings = self.catalog.list(&ListingFilter::default())?;
        let orders = self.orders.list_all()?;

        let count_role = |role: Role| users.iter().filter(|u| u.role == role).count();
        let count_status =
            |status: ListingStatus| listings.iter().filter(|l| l.status == status).count();

        Ok(Analytics {
            total_users: users.len() - count_role(Role::Superadmin),
            farmers: count_role(Role::Farmer),
            buyers: count_role(Role::Buyer),
            pending_users: users
                .iter()
                .filter(|u| !u.approved && u.role != Role::Superadmin)
                .count(),
            total_listings: listings.len(),
            active_listings: count_status(ListingStatus::Approved),
            pending_listings: count_status(ListingStatus::Pending),
            total_orders: orders.len(),
            total_sales: orders
                .iter()
                .fold(BigDecimal::zero(), |acc, o| acc + &o.total),
        })
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::infrastructure::InMemoryStore;

    fn user(role: Role, approved: bool) -> User {
        User {
            id: Uuid::new_v4(),
            name: format!("{} user", role),
            email: format!("{}@example.com", Uuid::new_v4()),
            role,
            approved,
            created_at: Utc::now(),
        }
    }

    fn admin_over(store: &Arc<InMemoryStore>) -> AdminService {
        AdminService::new(store.clone(), store.clone(), store.clone())
    }

    #[test]
    fn approve_flips_the_flag() {
        let store = Arc::new(InMemoryStore::new());
        let admin = admin_over(&store);
        let pending = UserDirectory::insert(store.as_ref(), user(Role::Buyer, false)).unwrap();

        let approved = admin.approve_user(pending.id).unwrap();
        assert!(approved.approved);
        assert!(matches!(
            admin.approve_user(Uuid::new_v4()),
            Err(DomainError::NotFound("User"))
        ));
    }

    #[test]
    fn reject_withdraws_approval() {
        let store = Arc::new(InMemoryStore::new());
        let admin = admin_over(&store);
        let farmer = UserDirectory::insert(store.as_ref(), user(Role::Farmer, true)).unwrap();
        let root = UserDirectory::insert(store.as_ref(), user(Role::Superadmin, true)).unwrap();

        let rejected = admin.reject_user(farmer.id).unwrap();
        assert!(!rejected.approved);
        let stored = UserDirectory::find_by_id(store.as_ref(), farmer.id).unwrap();
        assert!(!stored.unwrap().approved);
        assert!(matches!(
            admin.reject_user(root.id),
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            admin.reject_user(Uuid::new_v4()),
            Err(DomainError::NotFound("User"))
        ));
    }

    #[test]
    fn superadmin_seed_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let admin = admin_over(&store);
        let seed = SuperadminSeed {
            id: Uuid::new_v4(),
            name: "Super Admin".to_string(),
            email: "admin@local".to_string(),
        };

        let created = admin.seed_superadmin(&seed).unwrap().unwrap();
        assert_eq!(created.role, Role::Superadmin);
        assert!(created.approved);
        assert!(admin.seed_superadmin(&seed).unwrap().is_none());

        let other = SuperadminSeed {
            id: Uuid::new_v4(),
            ..seed
        };
        assert!(admin.seed_superadmin(&other).unwrap().is_none());
        assert_eq!(admin.list_users().unwrap().len(), 1);
    }

    #[test]
    fn superadmin_cannot_be_removed() {
        let store = Arc::new(InMemoryStore::new());
        let admin = admin_over(&store);
        let root = UserDirectory::insert(store.as_ref(), user(Role::Superadmin, true)).unwrap();
        let farmer = UserDirectory::insert(store.as_ref(), user(Role::Farmer, true)).unwrap();

        assert!(matches!(
            admin.remove_user(root.id),
            Err(DomainError::Forbidden(_))
        ));
        admin.remove_user(farmer.id).unwrap();
        assert_eq!(admin.list_users().unwrap().len(), 1);
    }

    #[test]
    fn analytics_excludes_superadmins_from_user_counts() {
        let store = Arc::new(InMemoryStore::new());
        let admin = admin_over(&store);
        for u in [
            user(Role::Superadmin, true),
            user(Role::Farmer, true),
            user(Role::Farmer, false),
            user(Role::Buyer, false),
        ] {
            UserDirectory::insert(store.as_ref(), u).unwrap();
        }

        let stats = admin.analytics().unwrap();
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.farmers, 2);
        assert_eq!(stats.buyers, 1);
        assert_eq!(stats.pending_users, 2);
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.total_sales, BigDecimal::zero());
    }
}
