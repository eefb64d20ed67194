use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{LineRequest, Order, OrderLine};
use crate::domain::user::{Principal, Role};
use crate::errors::AppError;
use crate::state::AppState;

use super::{parse_quantity, require};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub listing_id: Uuid,
    /// Number or numeric string; fractional amounts are allowed.
    #[serde(default)]
    #[schema(value_type = f64)]
    pub quantity: Value,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub listing_id: Uuid,
    pub name: String,
    pub farmer_id: Uuid,
    pub quantity: String,
    pub unit_price: String,
    pub subtotal: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub items: Vec<OrderLineResponse>,
    /// Decimal amount as a string, e.g. "30.00"
    pub total: String,
    pub status: String,
    pub created_at: String,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(l: OrderLine) -> Self {
        Self {
            listing_id: l.listing_id,
            name: l.name,
            farmer_id: l.farmer_id,
            quantity: l.quantity.to_string(),
            unit_price: l.unit_price.to_string(),
            subtotal: l.subtotal.to_string(),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            buyer_id: o.buyer_id,
            items: o.lines.into_iter().map(OrderLineResponse::from).collect(),
            total: o.total.to_string(),
            status: o.status,
            created_at: o.created_at.to_rfc3339(),
        }
    }
}

pub(crate) fn to_responses(orders: Vec<Order>) -> Vec<OrderResponse> {
    orders.into_iter().map(OrderResponse::from).collect()
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Validates every item against live stock and commits the order with its
/// inventory decrements. Any failing item rejects the whole order.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Empty order, bad quantity, unavailable listing or insufficient stock"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not an approved buyer"),
        (status = 503, description = "Storage unavailable"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    require(&principal, &[Role::Buyer])?;

    let lines = body
        .into_inner()
        .items
        .into_iter()
        .map(|item| {
            Ok(LineRequest {
                listing_id: item.listing_id,
                quantity: parse_quantity(&item.quantity)?,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    let order = web::block(move || state.orders.place_order(principal.user_id, lines)).await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/buyer
#[utoipa::path(
    get,
    path = "/orders/buyer",
    responses(
        (status = 200, description = "Orders placed by the caller, oldest first", body = [OrderResponse]),
        (status = 403, description = "Not an approved buyer"),
    ),
    tag = "orders"
)]
pub async fn buyer_orders(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    require(&principal, &[Role::Buyer])?;
    let orders = web::block(move || state.orders.orders_for_buyer(principal.user_id)).await??;
    Ok(HttpResponse::Ok().json(to_responses(orders)))
}

/// GET /orders/farmer
///
/// Orders containing the caller's crops, each reduced to the caller's lines
/// with `total` recomputed over them.
#[utoipa::path(
    get,
    path = "/orders/farmer",
    responses(
        (status = 200, description = "Orders projected to the caller's lines", body = [OrderResponse]),
        (status = 403, description = "Not an approved farmer"),
    ),
    tag = "orders"
)]
pub async fn farmer_orders(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    require(&principal, &[Role::Farmer])?;
    let orders =
        web::block(move || state.orders.orders_touching_farmer(principal.user_id)).await??;
    Ok(HttpResponse::Ok().json(to_responses(orders)))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Caller is not involved in the order"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    principal.require_approved()?;
    let order_id = path.into_inner();
    let order =
        web::block(move || state.orders.order_for_principal(&principal, order_id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
