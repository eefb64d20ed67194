use std::collections::BTreeSet;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const ORDER_STATUS_PLACED: &str = "placed";

/// One `{listingId, quantity}` entry of a purchase request.
#[derive(Debug, Clone)]
pub struct LineRequest {
    pub listing_id: Uuid,
    pub quantity: BigDecimal,
}

/// A committed line. `name`, `farmer_id` and `unit_price` are copies taken
/// at commit time, not references to the live listing.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub listing_id: Uuid,
    pub name: String,
    pub farmer_id: Uuid,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

/// Immutable once committed. `total` always equals the sum of line subtotals.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub total: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn touches_farmer(&self, farmer_id: Uuid) -> bool {
        self.lines.iter().any(|l| l.farmer_id == farmer_id)
    }

    /// Distinct farmers with lines in this order, sorted.
    pub fn farmer_ids(&self) -> Vec<Uuid> {
        self.lines
            .iter()
            .map(|l| l.farmer_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The order as `farmer_id` may see it: only their lines, with `total`
    /// recomputed over those lines. `None` if the farmer has no lines here.
    pub fn project_for_farmer(&self, farmer_id: Uuid) -> Option<Order> {
        let lines: Vec<OrderLine> = self
            .lines
            .iter()
            .filter(|l| l.farmer_id == farmer_id)
            .cloned()
            .collect();
        if lines.is_empty() {
            return None;
        }
        Some(Order {
            id: self.id,
            buyer_id: self.buyer_id,
            total: sum_subtotals(&lines),
            lines,
            status: self.status.clone(),
            created_at: self.created_at,
        })
    }
}

pub fn sum_subtotals(lines: &[OrderLine]) -> BigDecimal {
    lines
        .iter()
        .fold(BigDecimal::zero(), |acc, l| acc + &l.subtotal)
}

#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl OutboxEvent {
    /// The event recorded alongside every committed order.
    pub fn order_placed(order: &Order) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_type: "Order".to_string(),
            aggregate_id: order.id.to_string(),
            event_type: "OrderPlaced".to_string(),
            payload: serde_json::json!({
                "order_id": order.id,
                "buyer_id": order.buyer_id,
                "farmer_ids": order.farmer_ids(),
                "total": order.total.to_string(),
            }),
            created_at: order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(farmer_id: Uuid, quantity: i64, unit_price: i64) -> OrderLine {
        OrderLine {
            listing_id: Uuid::new_v4(),
            name: "Potatoes".to_string(),
            farmer_id,
            quantity: BigDecimal::from(quantity),
            unit_price: BigDecimal::from(unit_price),
            subtotal: BigDecimal::from(quantity * unit_price),
        }
    }

    fn order(lines: Vec<OrderLine>) -> Order {
        Order {
            id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            total: sum_subtotals(&lines),
            lines,
            status: ORDER_STATUS_PLACED.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn projection_keeps_only_that_farmers_lines() {
        let f1 = Uuid::new_v4();
        let f2 = Uuid::new_v4();
        let o = order(vec![line(f1, 2, 10), line(f2, 3, 7), line(f2, 1, 5)]);

        let projected = o.project_for_farmer(f2).expect("f2 has lines");
        assert_eq!(projected.lines.len(), 2);
        assert!(projected.lines.iter().all(|l| l.farmer_id == f2));
        assert_eq!(projected.total, BigDecimal::from(26));
        assert_eq!(projected.id, o.id);
    }

    #[test]
    fn projection_is_none_for_uninvolved_farmer() {
        let o = order(vec![line(Uuid::new_v4(), 1, 1)]);
        assert!(o.project_for_farmer(Uuid::new_v4()).is_none());
    }

    #[test]
    fn farmer_ids_are_distinct() {
        let f1 = Uuid::new_v4();
        let o = order(vec![line(f1, 1, 1), line(f1, 2, 2)]);
        assert_eq!(o.farmer_ids(), vec![f1]);
    }

    #[test]
    fn order_placed_event_names_the_farmers() {
        let f1 = Uuid::new_v4();
        let o = order(vec![line(f1, 3, 10)]);
        let event = OutboxEvent::order_placed(&o);
        assert_eq!(event.event_type, "OrderPlaced");
        assert_eq!(event.aggregate_id, o.id.to_string());
        assert_eq!(event.payload["farmer_ids"][0], f1.to_string());
        assert_eq!(event.payload["total"], "30");
    }
}
