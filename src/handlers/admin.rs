use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::Analytics;
use crate::domain::listing::ListingStatus;
use crate::domain::user::{Principal, Role, User};
use crate::errors::AppError;
use crate::state::AppState;

use super::listings::{self, ListingResponse};
use super::orders::{self, OrderResponse};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub approved: bool,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role.to_string(),
            approved: u.approved,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub total_users: usize,
    pub farmers: usize,
    pub buyers: usize,
    pub pending_users: usize,
    pub total_listings: usize,
    pub active_listings: usize,
    pub pending_listings: usize,
    pub total_orders: usize,
    pub total_sales: String,
}

impl From<Analytics> for AnalyticsResponse {
    fn from(a: Analytics) -> Self {
        Self {
            total_users: a.total_users,
            farmers: a.farmers,
            buyers: a.buyers,
            pending_users: a.pending_users,
            total_listings: a.total_listings,
            active_listings: a.active_listings,
            pending_listings: a.pending_listings,
            total_orders: a.total_orders,
            total_sales: a.total_sales.to_string(),
        }
    }
}

fn superadmin(principal: &Principal) -> Result<(), AppError> {
    principal.require_role(&[Role::Superadmin])?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 403, description = "Not a superadmin"),
    ),
    tag = "admin"
)]
pub async fn list_users(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    superadmin(&principal)?;
    let users = web::block(move || state.admin.list_users()).await??;
    let body: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}/approve",
    params(("id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User approved", body = UserResponse),
        (status = 404, description = "User not found"),
    ),
    tag = "admin"
)]
pub async fn approve_user(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    superadmin(&principal)?;
    let id = path.into_inner();
    let user = web::block(move || state.admin.approve_user(id)).await??;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}/reject",
    params(("id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "Approval withdrawn", body = UserResponse),
        (status = 403, description = "Target is a superadmin"),
        (status = 404, description = "User not found"),
    ),
    tag = "admin"
)]
pub async fn reject_user(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    superadmin(&principal)?;
    let id = path.into_inner();
    let user = web::block(move || state.admin.reject_user(id)).await??;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User removed"),
        (status = 403, description = "Target is a superadmin"),
        (status = 404, description = "User not found"),
    ),
    tag = "admin"
)]
pub async fn remove_user(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    superadmin(&principal)?;
    let id = path.into_inner();
    web::block(move || state.admin.remove_user(id)).await??;
    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}

#[utoipa::path(
    get,
    path = "/admin/listings",
    responses(
        (status = 200, description = "Listings in every status", body = [ListingResponse]),
    ),
    tag = "admin"
)]
pub async fn list_listings(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    superadmin(&principal)?;
    let all = web::block(move || state.catalog.all_listings()).await??;
    Ok(HttpResponse::Ok().json(listings::to_responses(all)))
}

async fn moderate(
    state: web::Data<AppState>,
    principal: Principal,
    id: Uuid,
    status: ListingStatus,
) -> Result<HttpResponse, AppError> {
    superadmin(&principal)?;
    let listing = web::block(move || state.catalog.set_status(id, status)).await??;
    Ok(HttpResponse::Ok().json(ListingResponse::from(listing)))
}

#[utoipa::path(
    put,
    path = "/admin/listings/{id}/approve",
    params(("id" = Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 200, description = "Listing approved", body = ListingResponse),
        (status = 404, description = "Listing not found"),
    ),
    tag = "admin"
)]
pub async fn approve_listing(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    moderate(state, principal, path.into_inner(), ListingStatus::Approved).await
}

#[utoipa::path(
    put,
    path = "/admin/listings/{id}/reject",
    params(("id" = Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 200, description = "Listing rejected", body = ListingResponse),
        (status = 404, description = "Listing not found"),
    ),
    tag = "admin"
)]
pub async fn reject_listing(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    moderate(state, principal, path.into_inner(), ListingStatus::Rejected).await
}

#[utoipa::path(
    delete,
    path = "/admin/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 204, description = "Listing deleted"),
        (status = 404, description = "Listing not found"),
    ),
    tag = "admin"
)]
pub async fn delete_listing(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    superadmin(&principal)?;
    let id = path.into_inner();
    web::block(move || state.catalog.delete_listing(&principal, id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/admin/orders",
    responses(
        (status = 200, description = "Every order, oldest first", body = [OrderResponse]),
    ),
    tag = "admin"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    superadmin(&principal)?;
    let all = web::block(move || state.orders.all_orders()).await??;
    Ok(HttpResponse::Ok().json(orders::to_responses(all)))
}

#[utoipa::path(
    get,
    path = "/admin/analytics",
    responses(
        (status = 200, description = "Marketplace counters", body = AnalyticsResponse),
    ),
    tag = "admin"
)]
pub async fn analytics(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    superadmin(&principal)?;
    let stats = web::block(move || state.admin.analytics()).await??;
    Ok(HttpResponse::Ok().json(AnalyticsResponse::from(stats)))
}
