pub mod errors;
pub mod listing;
pub mod order;
pub mod ports;
pub mod revenue;
pub mod user;
