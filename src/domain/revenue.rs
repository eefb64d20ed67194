use std::collections::BTreeMap;

use bigdecimal::{BigDecimal, Zero};
use uuid::Uuid;

use super::order::Order;

pub const RECENT_ORDERS_LIMIT: usize = 5;

/// A farmer's earnings, derived entirely from the order log.
#[derive(Debug, Clone, PartialEq)]
pub struct FarmerRevenue {
    pub farmer_id: Uuid,
    pub total_revenue: BigDecimal,
    pub total_orders: u64,
    /// Keyed by `YYYY-MM` of the order's UTC creation time.
    pub monthly_revenue: BTreeMap<String, BigDecimal>,
    /// Up to [`RECENT_ORDERS_LIMIT`] orders, oldest first, projected to the
    /// farmer's own lines.
    pub recent_orders: Vec<Order>,
}

/// Recomputes a farmer's revenue from scratch. `orders` must be in creation
/// order; no state is carried between calls.
pub fn aggregate(farmer_id: Uuid, orders: &[Order]) -> FarmerRevenue {
    let mut total_revenue = BigDecimal::zero();
    let mut total_orders = 0u64;
    let mut monthly_revenue: BTreeMap<String, BigDecimal> = BTreeMap::new();
    let mut touching: Vec<Order> = Vec::new();

    for order in orders {
        let Some(projected) = order.project_for_farmer(farmer_id) else {
            continue;
        };
        total_orders += 1;
        total_revenue += &projected.total;
        let month = projected.created_at.format("%Y-%m").to_string();
        let bucket = monthly_revenue.entry(month).or_insert_with(BigDecimal::zero);
        *bucket += &projected.total;
        touching.push(projected);
    }

    let skip = touching.len().saturating_sub(RECENT_ORDERS_LIMIT);
    let recent_orders = touching.into_iter().skip(skip).collect();

    FarmerRevenue {
        farmer_id,
        total_revenue,
        total_orders,
        monthly_revenue,
        recent_orders,
    }
}
