use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::listing::Listing;
use crate::domain::order::{Order, OrderLine, OutboxEvent};
use crate::domain::user::User;
use crate::schema::{listings, marketplace_outbox, order_lines, orders, users};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_domain(self) -> Result<User, DomainError> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role.parse()?,
            approved: self.approved,
            created_at: self.created_at,
        })
    }
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role.as_str().to_string(),
            approved: u.approved,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = listings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ListingRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub category: String,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub location: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ListingRow {
    pub fn into_domain(self) -> Result<Listing, DomainError> {
        Ok(Listing {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            category: self.category,
            quantity: self.quantity,
            price: self.price,
            location: self.location,
            description: self.description,
            status: self.status.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<&Listing> for ListingRow {
    fn from(l: &Listing) -> Self {
        Self {
            id: l.id,
            owner_id: l.owner_id,
            name: l.name.clone(),
            category: l.category.clone(),
            quantity: l.quantity.clone(),
            price: l.price.clone(),
            location: l.location.clone(),
            description: l.description.clone(),
            status: l.status.as_str().to_string(),
            created_at: l.created_at,
            updated_at: l.updated_at,
        }
    }
}

/// Partial update; `None` columns are left untouched.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = listings)]
pub struct ListingChangeset {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<BigDecimal>,
    pub price: Option<BigDecimal>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub total: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub listing_id: Uuid,
    pub name: String,
    pub farmer_id: Uuid,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

impl OrderRow {
    pub fn from_domain(order: &Order) -> (OrderRow, Vec<OrderLineRow>) {
        let row = OrderRow {
            id: order.id,
            buyer_id: order.buyer_id,
            total: order.total.clone(),
            status: order.status.clone(),
            created_at: order.created_at,
        };
        let lines = order
            .lines
            .iter()
            .enumerate()
            .map(|(position, l)| OrderLineRow {
                id: Uuid::new_v4(),
                order_id: order.id,
                position: position as i32,
                listing_id: l.listing_id,
                name: l.name.clone(),
                farmer_id: l.farmer_id,
                quantity: l.quantity.clone(),
                unit_price: l.unit_price.clone(),
                subtotal: l.subtotal.clone(),
            })
            .collect();
        (row, lines)
    }

    pub fn into_domain(self, mut lines: Vec<OrderLineRow>) -> Order {
        lines.sort_by_key(|l| l.position);
        Order {
            id: self.id,
            buyer_id: self.buyer_id,
            total: self.total,
            status: self.status,
            created_at: self.created_at,
            lines: lines
                .into_iter()
                .map(|l| OrderLine {
                    listing_id: l.listing_id,
                    name: l.name,
                    farmer_id: l.farmer_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                    subtotal: l.subtotal,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = marketplace_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl From<OutboxEvent> for OutboxEventRow {
    fn from(e: OutboxEvent) -> Self {
        Self {
            id: e.id,
            aggregate_type: e.aggregate_type,
            aggregate_id: e.aggregate_id,
            event_type: e.event_type,
            payload: e.payload,
            created_at: e.created_at,
        }
    }
}
