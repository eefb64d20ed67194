use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::listing::{Listing, ListingChanges, ListingFilter, NewListing};
use crate::domain::user::{Principal, Role};
use crate::errors::AppError;
use crate::state::AppState;

use super::{parse_price, parse_quantity, require, within_precision, PRICE_SCALE};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub name: String,
    pub category: String,
    pub quantity: String,
    pub price: String,
    pub location: String,
    pub description: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Listing> for ListingResponse {
    fn from(l: Listing) -> Self {
        Self {
            id: l.id,
            farmer_id: l.owner_id,
            name: l.name,
            category: l.category,
            quantity: l.quantity.to_string(),
            price: l.price.to_string(),
            location: l.location,
            description: l.description,
            status: l.status.to_string(),
            created_at: l.created_at.to_rfc3339(),
            updated_at: l.updated_at.to_rfc3339(),
        }
    }
}

pub(crate) fn to_responses(listings: Vec<Listing>) -> Vec<ListingResponse> {
    listings.into_iter().map(ListingResponse::from).collect()
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateListingRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub quantity: Value,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub price: Value,
    #[serde(default)]
    pub location: String,
    pub description: Option<String>,
}

impl CreateListingRequest {
    fn into_domain(self) -> Result<NewListing, DomainError> {
        Ok(NewListing {
            quantity: parse_quantity(&self.quantity)?,
            price: parse_price(&self.price)?,
            name: self.name,
            category: self.category,
            location: self.location,
            description: self.description.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateListingRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub quantity: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Value>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl UpdateListingRequest {
    fn into_domain(self) -> Result<ListingChanges, DomainError> {
        Ok(ListingChanges {
            quantity: self.quantity.as_ref().map(parse_quantity).transpose()?,
            price: self.price.as_ref().map(parse_price).transpose()?,
            name: self.name,
            category: self.category,
            location: self.location,
            description: self.description,
        })
    }
}

/// Catalog query string. Prices arrive as text and are parsed here.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BrowseQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

fn price_bound(raw: Option<String>) -> Result<Option<BigDecimal>, DomainError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => BigDecimal::from_str(s)
            .ok()
            .filter(|p| within_precision(p, PRICE_SCALE))
            .map(Some)
            .ok_or_else(|| DomainError::InvalidInput(format!("invalid price filter {}", s))),
    }
}

impl BrowseQuery {
    fn into_filter(self) -> Result<ListingFilter, DomainError> {
        Ok(ListingFilter {
            search: self.search,
            category: self.category,
            location: self.location,
            min_price: price_bound(self.min_price)?,
            max_price: price_bound(self.max_price)?,
            ..ListingFilter::approved()
        })
    }
}

/// GET /listings
#[utoipa::path(
    get,
    path = "/listings",
    params(BrowseQuery),
    responses(
        (status = 200, description = "Approved listings matching the filters", body = [ListingResponse]),
        (status = 400, description = "Unparseable price bound"),
    ),
    tag = "listings"
)]
pub async fn browse_listings(
    state: web::Data<AppState>,
    query: web::Query<BrowseQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.into_inner().into_filter()?;
    let listings = web::block(move || state.catalog.browse(filter)).await??;
    Ok(HttpResponse::Ok().json(to_responses(listings)))
}

/// GET /listings/mine
///
/// Every listing the caller owns, whatever its moderation status.
#[utoipa::path(
    get,
    path = "/listings/mine",
    responses(
        (status = 200, description = "Caller's listings", body = [ListingResponse]),
        (status = 403, description = "Not a farmer"),
    ),
    tag = "listings"
)]
pub async fn my_listings(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    principal.require_role(&[Role::Farmer])?;
    let listings =
        web::block(move || state.catalog.listings_for_farmer(principal.user_id)).await??;
    Ok(HttpResponse::Ok().json(to_responses(listings)))
}

/// GET /listings/{id}
#[utoipa::path(
    get,
    path = "/listings/{id}",
    params(
        ("id" = Uuid, Path, description = "Listing UUID"),
    ),
    responses(
        (status = 200, description = "Listing found", body = ListingResponse),
        (status = 404, description = "Listing not found or not approved"),
    ),
    tag = "listings"
)]
pub async fn get_listing(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let listing = web::block(move || state.catalog.get_public(id)).await??;
    Ok(HttpResponse::Ok().json(ListingResponse::from(listing)))
}

/// POST /listings
#[utoipa::path(
    post,
    path = "/listings",
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Listing created, pending approval", body = ListingResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Not an approved farmer"),
    ),
    tag = "listings"
)]
pub async fn create_listing(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<CreateListingRequest>,
) -> Result<HttpResponse, AppError> {
    require(&principal, &[Role::Farmer])?;
    let new = body.into_inner().into_domain()?;
    let listing = web::block(move || state.catalog.create_listing(&principal, new)).await??;
    Ok(HttpResponse::Created().json(ListingResponse::from(listing)))
}

/// PUT /listings/{id}
#[utoipa::path(
    put,
    path = "/listings/{id}",
    params(
        ("id" = Uuid, Path, description = "Listing UUID"),
    ),
    request_body = UpdateListingRequest,
    responses(
        (status = 200, description = "Listing updated and sent back for approval", body = ListingResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Listing not found"),
    ),
    tag = "listings"
)]
pub async fn update_listing(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
    body: web::Json<UpdateListingRequest>,
) -> Result<HttpResponse, AppError> {
    require(&principal, &[Role::Farmer])?;
    let id = path.into_inner();
    let changes = body.into_inner().into_domain()?;
    let listing =
        web::block(move || state.catalog.update_listing(&principal, id, changes)).await??;
    Ok(HttpResponse::Ok().json(ListingResponse::from(listing)))
}

/// DELETE /listings/{id}
#[utoipa::path(
    delete,
    path = "/listings/{id}",
    params(
        ("id" = Uuid, Path, description = "Listing UUID"),
    ),
    responses(
        (status = 204, description = "Listing deleted"),
        (status = 403, description = "Neither the owner nor a superadmin"),
        (status = 404, description = "Listing not found"),
    ),
    tag = "listings"
)]
pub async fn delete_listing(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    principal.require_role(&[Role::Farmer, Role::Superadmin])?;
    let id = path.into_inner();
    web::block(move || state.catalog.delete_listing(&principal, id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn blank_price_bounds_are_ignored() {
        assert_eq!(price_bound(None).unwrap(), None);
        assert_eq!(price_bound(Some("  ".to_string())).unwrap(), None);
        assert_eq!(
            price_bound(Some("2.50".to_string())).unwrap(),
            Some(BigDecimal::from_str("2.50").unwrap())
        );
        assert!(price_bound(Some("cheap".to_string())).is_err());
        assert!(price_bound(Some("1e-100000000".to_string())).is_err());
    }

    #[test]
    fn browse_query_always_targets_approved_listings() {
        let filter = BrowseQuery {
            category: Some("Vegetables".to_string()),
            ..BrowseQuery::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.status, ListingFilter::approved().status);
        assert_eq!(filter.owner_id, None);
    }

    #[test]
    fn create_request_accepts_string_amounts() {
        let req: CreateListingRequest = serde_json::from_value(json!({
            "name": "Tomatoes",
            "category": "Vegetables",
            "quantity": "12.5",
            "price": 3,
            "location": "Nakuru"
        }))
        .unwrap();
        let new = req.into_domain().unwrap();
        assert_eq!(new.quantity, BigDecimal::from_str("12.5").unwrap());
        assert_eq!(new.price, BigDecimal::from(3));
        assert_eq!(new.description, "");
    }

    #[test]
    fn update_request_leaves_absent_fields_unset() {
        let req: UpdateListingRequest =
            serde_json::from_value(json!({ "price": "4.75" })).unwrap();
        let changes = req.into_domain().unwrap();
        assert_eq!(changes.price, Some(BigDecimal::from_str("4.75").unwrap()));
        assert!(changes.quantity.is_none());
        assert!(changes.name.is_none());
    }
}
