use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ListingStatus::Pending),
            "approved" => Ok(ListingStatus::Approved),
            "rejected" => Ok(ListingStatus::Rejected),
            other => Err(DomainError::Internal(format!(
                "unknown listing status '{}'",
                other
            ))),
        }
    }
}

/// A farmer's sellable inventory. `quantity` and `price` are never negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub category: String,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub location: String,
    pub description: String,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn from_new(id: Uuid, owner_id: Uuid, new: NewListing, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_id,
            name: new.name,
            category: new.category,
            quantity: new.quantity,
            price: new.price,
            location: new.location,
            description: new.description,
            status: ListingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_purchasable(&self) -> bool {
        self.status == ListingStatus::Approved
    }

    /// Subtracts `amount` from the stock unless it exceeds it; returns
    /// whether the subtraction happened.
    pub fn take(&mut self, amount: &BigDecimal, now: DateTime<Utc>) -> bool {
        if *amount > self.quantity {
            return false;
        }
        self.quantity -= amount;
        self.updated_at = now;
        true
    }

    /// Applies an edit. Any edit sends the listing back for approval.
    pub fn apply(&mut self, changes: ListingChanges, now: DateTime<Utc>) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(quantity) = changes.quantity {
            self.quantity = quantity;
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(location) = changes.location {
            self.location = location;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        self.status = ListingStatus::Pending;
        self.updated_at = now;
    }
}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub name: String,
    pub category: String,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub location: String,
    pub description: String,
}

impl NewListing {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty()
            || self.category.trim().is_empty()
            || self.location.trim().is_empty()
        {
            return Err(DomainError::InvalidInput(
                "Please provide all required fields".to_string(),
            ));
        }
        if self.quantity <= BigDecimal::zero() {
            return Err(DomainError::InvalidQuantity(self.quantity.to_string()));
        }
        if self.price <= BigDecimal::zero() {
            return Err(DomainError::InvalidInput(format!(
                "price must be positive, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListingChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<BigDecimal>,
    pub price: Option<BigDecimal>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl ListingChanges {
    /// Blank required fields mean "keep the current value".
    pub fn without_blanks(self) -> Self {
        let keep = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            name: keep(self.name),
            category: keep(self.category),
            location: keep(self.location),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(quantity) = &self.quantity {
            if *quantity < BigDecimal::zero() {
                return Err(DomainError::InvalidQuantity(quantity.to_string()));
            }
        }
        if let Some(price) = &self.price {
            if *price < BigDecimal::zero() {
                return Err(DomainError::InvalidInput(format!(
                    "price must not be negative, got {}",
                    price
                )));
            }
        }
        Ok(())
    }
}

/// Catalog browsing filter. Empty strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub min_price: Option<BigDecimal>,
    pub max_price: Option<BigDecimal>,
    pub owner_id: Option<Uuid>,
    pub status: Option<ListingStatus>,
}

impl ListingFilter {
    pub fn approved() -> Self {
        Self {
            status: Some(ListingStatus::Approved),
            ..Self::default()
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(status) = self.status {
            if listing.status != status {
                return false;
            }
        }
        if let Some(owner) = self.owner_id {
            if listing.owner_id != owner {
                return false;
            }
        }
        if let Some(search) = non_blank(&self.search) {
            let haystack = format!(
                "{} {} {}",
                listing.name, listing.description, listing.category
            )
            .to_lowercase();
            if !haystack.contains(&search) {
                return false;
            }
        }
        if let Some(category) = non_blank(&self.category) {
            if listing.category.to_lowercase() != category {
                return false;
            }
        }
        if let Some(location) = non_blank(&self.location) {
            if !listing.location.to_lowercase().contains(&location) {
                return false;
            }
        }
        if let Some(min) = &self.min_price {
            if listing.price < *min {
                return false;
            }
        }
        if let Some(max) = &self.max_price {
            if listing.price > *max {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}
