use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No items in order")]
    EmptyOrder,

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Listing {0} unavailable")]
    ListingUnavailable(Uuid),

    /// `name` is carried so clients see which crop ran out, not just an id.
    #[error("Insufficient quantity for {name}")]
    InsufficientStock {
        listing_id: Uuid,
        name: String,
        available: BigDecimal,
        requested: BigDecimal,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        DomainError::Forbidden(msg.into())
    }
}
