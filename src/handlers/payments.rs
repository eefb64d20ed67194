use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::revenue::FarmerRevenue;
use crate::domain::user::{Principal, Role};
use crate::errors::AppError;
use crate::state::AppState;

use super::orders::{to_responses, OrderResponse};
use super::require;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevenueResponse {
    pub total_revenue: String,
    pub total_orders: u64,
    /// Keyed by `YYYY-MM`.
    pub monthly_revenue: BTreeMap<String, String>,
    /// Up to five orders, most recent last, reduced to the farmer's lines.
    pub recent_orders: Vec<OrderResponse>,
}

impl From<FarmerRevenue> for RevenueResponse {
    fn from(r: FarmerRevenue) -> Self {
        Self {
            total_revenue: r.total_revenue.to_string(),
            total_orders: r.total_orders,
            monthly_revenue: r
                .monthly_revenue
                .into_iter()
                .map(|(month, amount)| (month, amount.to_string()))
                .collect(),
            recent_orders: to_responses(r.recent_orders),
        }
    }
}

/// GET /payments/farmer/{farmerId}/revenue
#[utoipa::path(
    get,
    path = "/payments/farmer/{farmerId}/revenue",
    params(
        ("farmerId" = Uuid, Path, description = "Farmer UUID; must be the caller"),
    ),
    responses(
        (status = 200, description = "Revenue summary", body = RevenueResponse),
        (status = 403, description = "Not the farmer in the path, or not approved"),
    ),
    tag = "payments"
)]
pub async fn farmer_revenue(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require(&principal, &[Role::Farmer])?;
    let farmer_id = path.into_inner();
    if farmer_id != principal.user_id {
        return Err(DomainError::forbidden("Access denied").into());
    }

    let revenue = web::block(move || state.revenue.revenue_for_farmer(farmer_id)).await??;
    Ok(HttpResponse::Ok().json(RevenueResponse::from(revenue)))
}
