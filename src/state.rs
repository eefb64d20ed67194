use std::sync::Arc;

use crate::application::{AdminService, CatalogService, OrderService, RevenueAggregator};
use crate::auth::TokenVerifier;
use crate::db::DbPool;
use crate::domain::ports::{CatalogStore, OrderStore, UserDirectory};
use crate::infrastructure::{InMemoryStore, PgCatalogStore, PgOrderStore, PgUserDirectory};

/// Everything a handler needs, shared across workers behind `web::Data`.
pub struct AppState {
    pub orders: OrderService,
    pub catalog: CatalogService,
    pub revenue: RevenueAggregator,
    pub admin: AdminService,
    pub users: Arc<dyn UserDirectory>,
    pub tokens: TokenVerifier,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        tokens: TokenVerifier,
    ) -> Self {
        Self {
            orders: OrderService::new(orders.clone()),
            catalog: CatalogService::new(catalog.clone()),
            revenue: RevenueAggregator::new(orders.clone()),
            admin: AdminService::new(users.clone(), catalog, orders),
            users,
            tokens,
        }
    }

    pub fn postgres(pool: DbPool, tokens: TokenVerifier) -> Self {
        Self::new(
            Arc::new(PgUserDirectory::new(pool.clone())),
            Arc::new(PgCatalogStore::new(pool.clone())),
            Arc::new(PgOrderStore::new(pool)),
            tokens,
        )
    }

    pub fn in_memory(store: Arc<InMemoryStore>, tokens: TokenVerifier) -> Self {
        Self::new(store.clone(), store.clone(), store, tokens)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::application::SuperadminSeed;
    use crate::domain::user::Role;

    #[test]
    fn seeded_superadmin_is_visible_through_the_directory() {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::in_memory(store, TokenVerifier::new(&[7u8; 32]));
        let seed = SuperadminSeed {
            id: Uuid::new_v4(),
            name: "Super Admin".to_string(),
            email: "root@market.test".to_string(),
        };

        assert!(state.admin.seed_superadmin(&seed).unwrap().is_some());
        assert!(state.admin.seed_superadmin(&seed).unwrap().is_none());

        let user = state.users.find_by_id(seed.id).unwrap().unwrap();
        assert_eq!(user.role, Role::Superadmin);
        assert!(user.approved);
        assert_eq!(state.users.list().unwrap().len(), 1);
    }
}
