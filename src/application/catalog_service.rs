use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::listing::{Listing, ListingChanges, ListingFilter, ListingStatus, NewListing};
use crate::domain::ports::CatalogStore;
use crate::domain::user::Principal;

pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// New listings wait for admin approval before they can be bought.
    pub fn create_listing(
        &self,
        farmer: &Principal,
        new: NewListing,
    ) -> Result<Listing, DomainError> {
        new.validate()?;
        let listing = Listing::from_new(Uuid::new_v4(), farmer.user_id, new, Utc::now());
        let listing = self.catalog.insert(listing)?;
        log::info!("listing {} created by farmer {}", listing.id, farmer.user_id);
        Ok(listing)
    }

    pub fn update_listing(
        &self,
        farmer: &Principal,
        id: Uuid,
        changes: ListingChanges,
    ) -> Result<Listing, DomainError> {
        let changes = changes.without_blanks();
        changes.validate()?;
        let existing = self.catalog.get(id)?.ok_or(DomainError::NotFound("Listing"))?;
        if existing.owner_id != farmer.user_id {
            return Err(DomainError::forbidden("You can only update your own listings"));
        }
        self.catalog
            .update(id, changes)?
            .ok_or(DomainError::NotFound("Listing"))
    }

    /// Owners may delete their own listings; superadmins may delete any.
    pub fn delete_listing(&self, principal: &Principal, id: Uuid) -> Result<(), DomainError> {
        let existing = self.catalog.get(id)?.ok_or(DomainError::NotFound("Listing"))?;
        if !principal.is_admin() && existing.owner_id != principal.user_id {
            return Err(DomainError::forbidden("You can only delete your own listings"));
        }
        if !self.catalog.delete(id)? {
            return Err(DomainError::NotFound("Listing"));
        }
        log::info!("listing {} deleted by {}", id, principal.user_id);
        Ok(())
    }

    /// Public catalog: approved listings only, whatever the filter says.
    pub fn browse(&self, mut filter: ListingFilter) -> Result<Vec<Listing>, DomainError> {
        filter.status = Some(ListingStatus::Approved);
        self.catalog.list(&filter)
    }

    pub fn get_public(&self, id: Uuid) -> Result<Listing, DomainError> {
        self.catalog
            .get(id)?
            .filter(Listing::is_purchasable)
            .ok_or(DomainError::NotFound("Listing"))
    }

    pub fn listings_for_farmer(&self, farmer_id: Uuid) -> Result<Vec<Listing>, DomainError> {
        self.catalog.list(&ListingFilter {
            owner_id: Some(farmer_id),
            ..ListingFilter::default()
        })
    }

    pub fn all_listings(&self) -> Result<Vec<Listing>, DomainError> {
        self.catalog.list(&ListingFilter::default())
    }

    pub fn set_status(&self, id: Uuid, status: ListingStatus) -> Result<Listing, DomainError> {
        let listing = self
            .catalog
            .set_status(id, status)?
            .ok_or(DomainError::NotFound("Listing"))?;
        log::info!("listing {} marked {}", id, status);
        Ok(listing)
    }
}
