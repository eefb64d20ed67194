use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// `checkout_timeout` bounds how long a request waits for a connection;
/// hitting it surfaces as `StorageUnavailable`.
pub fn create_pool(
    database_url: &str,
    max_size: u32,
    checkout_timeout: Duration,
) -> Result<DbPool, r2d2::Error> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .connection_timeout(checkout_timeout)
        .build(manager)
}
