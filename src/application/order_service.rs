use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::listing::Listing;
use crate::domain::order::{sum_subtotals, LineRequest, Order, OrderLine, ORDER_STATUS_PLACED};
use crate::domain::ports::OrderStore;
use crate::domain::user::Principal;

pub struct OrderService {
    orders: Arc<dyn OrderStore>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Validates every line against the locked catalog and commits the order
    /// with its decrements, or fails without changing anything.
    pub fn place_order(
        &self,
        buyer_id: Uuid,
        requested: Vec<LineRequest>,
    ) -> Result<Order, DomainError> {
        check_request(&requested)?;

        let listing_ids: Vec<Uuid> = requested.iter().map(|l| l.listing_id).collect();
        let plan = |locked: &HashMap<Uuid, Listing>| {
            plan_order(buyer_id, &requested, locked, Utc::now())
        };

        match self.orders.commit(&listing_ids, &plan) {
            Ok(order) => {
                log::info!(
                    "order {} placed by {}: {} line(s), total {}, farmers {:?}",
                    order.id,
                    buyer_id,
                    order.lines.len(),
                    order.total,
                    order.farmer_ids()
                );
                Ok(order)
            }
            Err(e) => {
                log::warn!("order by {} rejected: {}", buyer_id, e);
                Err(e)
            }
        }
    }

    pub fn orders_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>, DomainError> {
        self.orders.list_for_buyer(buyer_id)
    }

    /// Orders with lines sold by `farmer_id`, each reduced to those lines.
    pub fn orders_touching_farmer(&self, farmer_id: Uuid) -> Result<Vec<Order>, DomainError> {
        Ok(self
            .orders
            .list_touching_farmer(farmer_id)?
            .iter()
            .filter_map(|o| o.project_for_farmer(farmer_id))
            .collect())
    }

    /// The buyer and admins see the whole order; a farmer sees only their
    /// own lines.
    pub fn order_for_principal(
        &self,
        principal: &Principal,
        order_id: Uuid,
    ) -> Result<Order, DomainError> {
        let order = self
            .orders
            .find_by_id(order_id)?
            .ok_or(DomainError::NotFound("Order"))?;

        if principal.is_admin() || order.buyer_id == principal.user_id {
            return Ok(order);
        }
        order
            .project_for_farmer(principal.user_id)
            .ok_or_else(|| DomainError::forbidden("Access denied"))
    }

    pub fn all_orders(&self) -> Result<Vec<Order>, DomainError> {
        self.orders.list_all()
    }
}

fn check_request(requested: &[LineRequest]) -> Result<(), DomainError> {
    if requested.is_empty() {
        return Err(DomainError::EmptyOrder);
    }
    if let Some(bad) = requested.iter().find(|l| l.quantity <= BigDecimal::zero()) {
        return Err(DomainError::InvalidQuantity(bad.quantity.to_string()));
    }
    Ok(())
}

/// Prices `requested` against `locked`, checking lines in input order.
/// Repeated listings draw on the same remaining stock.
pub fn plan_order(
    buyer_id: Uuid,
    requested: &[LineRequest],
    locked: &HashMap<Uuid, Listing>,
    now: DateTime<Utc>,
) -> Result<Order, DomainError> {
    let mut remaining: HashMap<Uuid, BigDecimal> = HashMap::new();
    let mut lines = Vec::with_capacity(requested.len());

    for req in requested {
        let listing = locked
            .get(&req.listing_id)
            .filter(|l| l.is_purchasable())
            .ok_or(DomainError::ListingUnavailable(req.listing_id))?;

        let available = remaining
            .entry(listing.id)
            .or_insert_with(|| listing.quantity.clone());
        if req.quantity > *available {
            return Err(DomainError::InsufficientStock {
                listing_id: listing.id,
                name: listing.name.clone(),
                available: available.clone(),
                requested: req.quantity.clone(),
            });
        }
        *available -= &req.quantity;

        lines.push(OrderLine {
            listing_id: listing.id,
            name: listing.name.clone(),
            farmer_id: listing.owner_id,
            quantity: req.quantity.clone(),
            unit_price: listing.price.clone(),
            subtotal: &listing.price * &req.quantity,
        });
    }

    Ok(Order {
        id: Uuid::new_v4(),
        buyer_id,
        total: sum_subtotals(&lines),
        lines,
        status: ORDER_STATUS_PLACED.to_string(),
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::domain::listing::{ListingChanges, ListingStatus, NewListing};
    use crate::domain::ports::CatalogStore;
    use crate::domain::user::Role;
    use crate::infrastructure::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: OrderService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let service = OrderService::new(store.clone());
        Fixture { store, service }
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn add_listing(
        store: &InMemoryStore,
        farmer: Uuid,
        name: &str,
        quantity: &str,
        price: &str,
        status: ListingStatus,
    ) -> Listing {
        let mut listing = Listing::from_new(
            Uuid::new_v4(),
            farmer,
            NewListing {
                name: name.to_string(),
                category: "Vegetables".to_string(),
                quantity: dec(quantity),
                price: dec(price),
                location: "Nagpur".to_string(),
                description: String::new(),
            },
            Utc::now(),
        );
        listing.status = status;
        CatalogStore::insert(store, listing).unwrap()
    }

    fn line(listing: &Listing, quantity: &str) -> LineRequest {
        LineRequest {
            listing_id: listing.id,
            quantity: dec(quantity),
        }
    }

    fn quantity_of(store: &InMemoryStore, id: Uuid) -> BigDecimal {
        CatalogStore::get(store, id).unwrap().unwrap().quantity
    }

    #[test]
    fn second_order_fails_when_stock_runs_out() {
        let f = fixture();
        let farmer = Uuid::new_v4();
        let buyer = Uuid::new_v4();
        let l1 = add_listing(&f.store, farmer, "Tomatoes", "5", "10", ListingStatus::Approved);

        let first = f.service.place_order(buyer, vec![line(&l1, "3")]).unwrap();
        assert_eq!(first.total, dec("30"));
        assert_eq!(quantity_of(&f.store, l1.id), dec("2"));

        let err = f.service.place_order(buyer, vec![line(&l1, "3")]).unwrap_err();
        match err {
            DomainError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, dec("2"));
                assert_eq!(requested, dec("3"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(quantity_of(&f.store, l1.id), dec("2"));
        assert_eq!(f.service.orders_for_buyer(buyer).unwrap().len(), 1);
    }

    #[test]
    fn one_bad_line_rejects_the_whole_order() {
        let f = fixture();
        let farmer = Uuid::new_v4();
        let a = add_listing(&f.store, farmer, "Onions", "10", "2", ListingStatus::Approved);
        let b = add_listing(&f.store, farmer, "Garlic", "1", "8", ListingStatus::Approved);

        let err = f
            .service
            .place_order(Uuid::new_v4(), vec![line(&a, "4"), line(&b, "2")])
            .unwrap_err();

        assert_eq!(err.to_string(), "Insufficient quantity for Garlic");
        assert_eq!(quantity_of(&f.store, a.id), dec("10"));
        assert_eq!(quantity_of(&f.store, b.id), dec("1"));
        assert!(f.service.all_orders().unwrap().is_empty());
        assert!(f.store.outbox().unwrap().is_empty());
    }

    #[test]
    fn unapproved_or_missing_listing_is_unavailable() {
        let f = fixture();
        let pending = add_listing(
            &f.store,
            Uuid::new_v4(),
            "Chillies",
            "10",
            "3",
            ListingStatus::Pending,
        );

        assert!(matches!(
            f.service.place_order(Uuid::new_v4(), vec![line(&pending, "1")]),
            Err(DomainError::ListingUnavailable(id)) if id == pending.id
        ));

        let ghost = LineRequest {
            listing_id: Uuid::new_v4(),
            quantity: dec("1"),
        };
        assert!(matches!(
            f.service.place_order(Uuid::new_v4(), vec![ghost]),
            Err(DomainError::ListingUnavailable(_))
        ));
    }

    #[test]
    fn first_failing_line_in_input_order_is_reported() {
        let f = fixture();
        let farmer = Uuid::new_v4();
        let short = add_listing(&f.store, farmer, "Peas", "1", "3", ListingStatus::Approved);
        let hidden = add_listing(&f.store, farmer, "Corn", "5", "3", ListingStatus::Rejected);

        let err = f
            .service
            .place_order(Uuid::new_v4(), vec![line(&short, "2"), line(&hidden, "1")])
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
    }

    #[test]
    fn empty_and_non_positive_requests_are_rejected() {
        let f = fixture();
        let l = add_listing(&f.store, Uuid::new_v4(), "Rice", "10", "1", ListingStatus::Approved);

        assert!(matches!(
            f.service.place_order(Uuid::new_v4(), vec![]),
            Err(DomainError::EmptyOrder)
        ));
        assert!(matches!(
            f.service.place_order(Uuid::new_v4(), vec![line(&l, "0")]),
            Err(DomainError::InvalidQuantity(_))
        ));
        assert!(matches!(
            f.service.place_order(Uuid::new_v4(), vec![line(&l, "-2")]),
            Err(DomainError::InvalidQuantity(_))
        ));
        assert_eq!(quantity_of(&f.store, l.id), dec("10"));
    }

    #[test]
    fn repeated_listing_lines_share_the_stock() {
        let f = fixture();
        let l = add_listing(&f.store, Uuid::new_v4(), "Wheat", "5", "2", ListingStatus::Approved);

        let err = f
            .service
            .place_order(Uuid::new_v4(), vec![line(&l, "3"), line(&l, "3")])
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(quantity_of(&f.store, l.id), dec("5"));

        let ok = f
            .service
            .place_order(Uuid::new_v4(), vec![line(&l, "2"), line(&l, "3")])
            .unwrap();
        assert_eq!(ok.total, dec("10"));
        assert_eq!(quantity_of(&f.store, l.id), dec("0"));
    }

    #[test]
    fn fractional_quantities_are_priced_exactly() {
        let f = fixture();
        let l = add_listing(&f.store, Uuid::new_v4(), "Saffron", "1.5", "0.10", ListingStatus::Approved);

        let order = f
            .service
            .place_order(Uuid::new_v4(), vec![line(&l, "0.3")])
            .unwrap();
        assert_eq!(order.total, dec("0.03"));
        assert_eq!(quantity_of(&f.store, l.id), dec("1.2"));
    }

    #[test]
    fn later_price_edits_do_not_touch_history() {
        let f = fixture();
        let l = add_listing(&f.store, Uuid::new_v4(), "Apples", "10", "40", ListingStatus::Approved);
        let buyer = Uuid::new_v4();
        let placed = f.service.place_order(buyer, vec![line(&l, "2")]).unwrap();

        CatalogStore::update(
            f.store.as_ref(),
            l.id,
            ListingChanges {
                price: Some(dec("99")),
                name: Some("Shimla Apples".to_string()),
                ..ListingChanges::default()
            },
        )
        .unwrap();

        let history = f.service.orders_for_buyer(buyer).unwrap();
        assert_eq!(history, vec![placed]);
        assert_eq!(history[0].lines[0].unit_price, dec("40"));
        assert_eq!(history[0].lines[0].subtotal, dec("80"));
        assert_eq!(history[0].lines[0].name, "Apples");
    }

    #[test]
    fn concurrent_buyers_never_oversell() {
        let f = fixture();
        let l = add_listing(&f.store, Uuid::new_v4(), "Mangoes", "10", "5", ListingStatus::Approved);
        let id = l.id;

        let committed: Vec<BigDecimal> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..32)
                .map(|i| {
                    let service = &f.service;
                    s.spawn(move || {
                        let qty = BigDecimal::from(1 + (i % 3));
                        service
                            .place_order(
                                Uuid::new_v4(),
                                vec![LineRequest {
                                    listing_id: id,
                                    quantity: qty.clone(),
                                }],
                            )
                            .ok()
                            .map(|_| qty)
                    })
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().unwrap())
                .collect()
        });

        let sold = committed
            .iter()
            .fold(BigDecimal::zero(), |acc, q| acc + q);
        let left = quantity_of(&f.store, id);
        assert!(left >= BigDecimal::zero());
        assert!(sold <= dec("10"));
        assert_eq!(sold + left, dec("10"));
        assert_eq!(f.service.all_orders().unwrap().len(), committed.len());
    }

    #[test]
    fn crossing_multi_line_orders_do_not_deadlock() {
        let f = fixture();
        let farmer = Uuid::new_v4();
        let a = add_listing(&f.store, farmer, "Lentils", "100", "1", ListingStatus::Approved);
        let b = add_listing(&f.store, farmer, "Chickpeas", "100", "1", ListingStatus::Approved);

        std::thread::scope(|s| {
            for i in 0..16 {
                let service = &f.service;
                let (first, second) = if i % 2 == 0 { (&a, &b) } else { (&b, &a) };
                s.spawn(move || {
                    service
                        .place_order(Uuid::new_v4(), vec![line(first, "1"), line(second, "1")])
                        .unwrap();
                });
            }
        });

        assert_eq!(quantity_of(&f.store, a.id), dec("84"));
        assert_eq!(quantity_of(&f.store, b.id), dec("84"));
    }

    #[test]
    fn farmer_view_hides_other_farmers_lines() {
        let f = fixture();
        let f1 = Uuid::new_v4();
        let f2 = Uuid::new_v4();
        let a = add_listing(&f.store, f1, "Carrots", "10", "10", ListingStatus::Approved);
        let b = add_listing(&f.store, f2, "Beets", "10", "6", ListingStatus::Approved);
        f.service
            .place_order(Uuid::new_v4(), vec![line(&a, "1"), line(&b, "2")])
            .unwrap();

        let seen = f.service.orders_touching_farmer(f2).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].lines.len(), 1);
        assert_eq!(seen[0].lines[0].farmer_id, f2);
        assert_eq!(seen[0].total, dec("12"));
        assert!(f.service.orders_touching_farmer(Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn single_order_access_follows_involvement() {
        let f = fixture();
        let f1 = Uuid::new_v4();
        let f2 = Uuid::new_v4();
        let buyer = Uuid::new_v4();
        let a = add_listing(&f.store, f1, "Spinach", "10", "1", ListingStatus::Approved);
        let b = add_listing(&f.store, f2, "Kale", "10", "2", ListingStatus::Approved);
        let order = f
            .service
            .place_order(buyer, vec![line(&a, "1"), line(&b, "1")])
            .unwrap();

        let as_buyer = Principal { user_id: buyer, role: Role::Buyer, approved: true };
        let as_farmer = Principal { user_id: f1, role: Role::Farmer, approved: true };
        let as_admin = Principal { user_id: Uuid::new_v4(), role: Role::Superadmin, approved: true };
        let stranger = Principal { user_id: Uuid::new_v4(), role: Role::Buyer, approved: true };

        assert_eq!(f.service.order_for_principal(&as_buyer, order.id).unwrap(), order);
        assert_eq!(f.service.order_for_principal(&as_admin, order.id).unwrap(), order);
        let projected = f.service.order_for_principal(&as_farmer, order.id).unwrap();
        assert_eq!(projected.lines.len(), 1);
        assert!(matches!(
            f.service.order_for_principal(&stranger, order.id),
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.order_for_principal(&as_buyer, Uuid::new_v4()),
            Err(DomainError::NotFound(_))
        ));
    }
}
