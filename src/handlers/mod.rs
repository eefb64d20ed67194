pub mod admin;
pub mod listings;
pub mod orders;
pub mod payments;

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Value;
use utoipa::OpenApi;

use crate::domain::errors::DomainError;
use crate::domain::user::{Principal, Role};

#[derive(OpenApi)]
#[openapi(
    paths(
        orders::place_order,
        orders::buyer_orders,
        orders::farmer_orders,
        orders::get_order,
        payments::farmer_revenue,
        listings::browse_listings,
        listings::my_listings,
        listings::get_listing,
        listings::create_listing,
        listings::update_listing,
        listings::delete_listing,
        admin::list_users,
        admin::approve_user,
        admin::reject_user,
        admin::remove_user,
        admin::list_listings,
        admin::approve_listing,
        admin::reject_listing,
        admin::delete_listing,
        admin::list_orders,
        admin::analytics,
    ),
    components(schemas(
        orders::PlaceOrderRequest,
        orders::OrderItemRequest,
        orders::OrderResponse,
        orders::OrderLineResponse,
        payments::RevenueResponse,
        listings::ListingResponse,
        listings::CreateListingRequest,
        listings::UpdateListingRequest,
        admin::UserResponse,
        admin::AnalyticsResponse,
    )),
    tags(
        (name = "orders", description = "Order placement and history"),
        (name = "payments", description = "Farmer revenue"),
        (name = "listings", description = "Crop catalog"),
        (name = "admin", description = "Superadmin moderation"),
    )
)]
pub struct ApiDoc;

/// Role and approval gate applied before a service is invoked.
pub(crate) fn require(principal: &Principal, roles: &[Role]) -> Result<(), DomainError> {
    principal.require_role(roles)?.require_approved()?;
    Ok(())
}

/// Longest accepted digit string, before and after normalisation.
const MAX_DIGITS: u64 = 20;
const MAX_INTEGER_DIGITS: i64 = 12;
pub(crate) const QUANTITY_SCALE: i64 = 3;
pub(crate) const PRICE_SCALE: i64 = 2;

/// Accepts a JSON number or a numeric string, as the web clients send both.
pub(crate) fn parse_decimal(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Rejects values whose exponent or digit count is out of range. Arithmetic
/// on an unbounded exponent has to materialise every digit, so this runs
/// before the value reaches a comparison or a subtraction.
pub(crate) fn within_precision(value: &BigDecimal, max_scale: i64) -> bool {
    if value.digits() > MAX_DIGITS {
        return false;
    }
    let normalized = value.normalized();
    let (_, scale) = normalized.as_bigint_and_exponent();
    let integer_digits = normalized.digits() as i64 - scale;
    scale <= max_scale && integer_digits <= MAX_INTEGER_DIGITS
}

pub(crate) fn parse_quantity(value: &Value) -> Result<BigDecimal, DomainError> {
    parse_decimal(value)
        .filter(|q| within_precision(q, QUANTITY_SCALE))
        .ok_or_else(|| DomainError::InvalidQuantity(value.to_string()))
}

pub(crate) fn parse_price(value: &Value) -> Result<BigDecimal, DomainError> {
    parse_decimal(value)
        .filter(|p| within_precision(p, PRICE_SCALE))
        .ok_or_else(|| DomainError::InvalidInput(format!("invalid price {}", value)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_and_numeric_strings_parse() {
        assert_eq!(parse_decimal(&json!(3)), Some(BigDecimal::from(3)));
        assert_eq!(
            parse_decimal(&json!(2.5)),
            Some(BigDecimal::from_str("2.5").unwrap())
        );
        assert_eq!(
            parse_decimal(&json!(" 0.25 ")),
            Some(BigDecimal::from_str("0.25").unwrap())
        );
    }

    #[test]
    fn non_numeric_quantity_is_invalid() {
        for v in [json!("three"), json!(null), json!([1]), json!(true)] {
            assert!(matches!(
                parse_quantity(&v),
                Err(DomainError::InvalidQuantity(_))
            ));
        }
    }

    #[test]
    fn extreme_exponents_are_rejected_before_arithmetic() {
        for v in [
            json!("1e-100000000"),
            json!("1e100000000"),
            json!("0.0001"),
            json!("123456789012345678901234"),
        ] {
            assert!(matches!(
                parse_quantity(&v),
                Err(DomainError::InvalidQuantity(_))
            ));
            assert!(matches!(parse_price(&v), Err(DomainError::InvalidInput(_))));
        }
    }

    #[test]
    fn ordinary_amounts_stay_within_precision() {
        assert!(parse_quantity(&json!("2.125")).is_ok());
        assert!(parse_quantity(&json!(1000)).is_ok());
        assert!(parse_price(&json!("19.99")).is_ok());
        // Trailing zeros do not count against the scale.
        assert!(parse_price(&json!("4.7500")).is_ok());
        assert!(parse_price(&json!("1e3")).is_ok());
        assert!(parse_price(&json!("2.505")).is_err());
    }
}
