use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::OrderStore;
use crate::domain::revenue::{aggregate, FarmerRevenue};

/// Read model over the order log. Nothing is cached: every call rebuilds
/// the figures from the orders themselves.
pub struct RevenueAggregator {
    orders: Arc<dyn OrderStore>,
}

impl RevenueAggregator {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    pub fn revenue_for_farmer(&self, farmer_id: Uuid) -> Result<FarmerRevenue, DomainError> {
        let orders = self.orders.list_touching_farmer(farmer_id)?;
        Ok(aggregate(farmer_id, &orders))
    }
}
