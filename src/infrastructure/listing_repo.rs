use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::listing::{Listing, ListingChanges, ListingFilter, ListingStatus};
use crate::domain::ports::CatalogStore;
use crate::schema::listings;

use super::models::{ListingChangeset, ListingRow};

pub struct PgCatalogStore {
    pool: DbPool,
}

impl PgCatalogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogStore for PgCatalogStore {
    fn insert(&self, listing: Listing) -> Result<Listing, DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(listings::table)
            .values(&ListingRow::from(&listing))
            .returning(ListingRow::as_returning())
            .get_result(&mut conn)?
            .into_domain()
    }

    fn get(&self, id: Uuid) -> Result<Option<Listing>, DomainError> {
        let mut conn = self.pool.get()?;
        listings::table
            .find(id)
            .select(ListingRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(ListingRow::into_domain)
            .transpose()
    }

    fn list(&self, filter: &ListingFilter) -> Result<Vec<Listing>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = listings::table
            .select(ListingRow::as_select())
            .order((listings::created_at.asc(), listings::id.asc()))
            .into_boxed();
        if let Some(status) = filter.status {
            query = query.filter(listings::status.eq(status.as_str()));
        }
        if let Some(owner) = filter.owner_id {
            query = query.filter(listings::owner_id.eq(owner));
        }
        if let Some(min) = &filter.min_price {
            query = query.filter(listings::price.ge(min.clone()));
        }
        if let Some(max) = &filter.max_price {
            query = query.filter(listings::price.le(max.clone()));
        }

        // Text matching stays in the domain so both stores agree on it.
        query
            .load::<ListingRow>(&mut conn)?
            .into_iter()
            .map(ListingRow::into_domain)
            .filter(|l| l.as_ref().map_or(true, |l| filter.matches(l)))
            .collect()
    }

    fn update(&self, id: Uuid, changes: ListingChanges) -> Result<Option<Listing>, DomainError> {
        let mut conn = self.pool.get()?;
        let changeset = ListingChangeset {
            name: changes.name,
            category: changes.category,
            quantity: changes.quantity,
            price: changes.price,
            location: changes.location,
            description: changes.description,
            status: Some(ListingStatus::Pending.as_str().to_string()),
            updated_at: Some(Utc::now()),
        };
        diesel::update(listings::table.find(id))
            .set(&changeset)
            .returning(ListingRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(ListingRow::into_domain)
            .transpose()
    }

    fn set_status(
        &self,
        id: Uuid,
        status: ListingStatus,
    ) -> Result<Option<Listing>, DomainError> {
        let mut conn = self.pool.get()?;
        diesel::update(listings::table.find(id))
            .set((
                listings::status.eq(status.as_str()),
                listings::updated_at.eq(Utc::now()),
            ))
            .returning(ListingRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(ListingRow::into_domain)
            .transpose()
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(listings::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn compare_and_decrement(&self, id: Uuid, amount: &BigDecimal) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        if decrement_guarded(&mut conn, id, amount, Utc::now())? {
            return Ok(true);
        }

        let exists: bool =
            diesel::select(diesel::dsl::exists(listings::table.find(id))).get_result(&mut conn)?;
        if exists {
            Ok(false)
        } else {
            Err(DomainError::NotFound("Listing"))
        }
    }
}

/// Subtracts `amount` from the listing's quantity unless it exceeds it.
/// The guard lives in the WHERE clause, so the check and the write are one
/// statement under the row lock. Also used inside the order commit
/// transaction.
pub(crate) fn decrement_guarded(
    conn: &mut PgConnection,
    id: Uuid,
    amount: &BigDecimal,
    now: DateTime<Utc>,
) -> QueryResult<bool> {
    let updated = diesel::update(
        listings::table
            .filter(listings::id.eq(id))
            .filter(listings::quantity.ge(amount.clone())),
    )
    .set((
        listings::quantity.eq(listings::quantity - amount.clone()),
        listings::updated_at.eq(now),
    ))
    .execute(conn)?;
    Ok(updated == 1)
}
