pub mod admin_service;
pub mod catalog_service;
pub mod order_service;
pub mod revenue;

pub use admin_service::{AdminService, Analytics, SuperadminSeed};
pub use catalog_service::CatalogService;
pub use order_service::OrderService;
pub use revenue::RevenueAggregator;
