use std::sync::Arc;

use agri_market::auth::TokenVerifier;
use agri_market::config::{Config, StoreBackend};
use agri_market::infrastructure::InMemoryStore;
use agri_market::{build_server, create_pool, run_migrations, AppState};
use dotenvy::dotenv;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().expect("Invalid configuration");
    let tokens = TokenVerifier::new(config.jwt_secret.as_bytes());

    let state = match config.backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set");
            let pool = create_pool(url, config.pool_size, config.storage_timeout)
                .expect("Failed to create DB pool");
            run_migrations(&pool).expect("Failed to run database migrations");
            AppState::postgres(pool, tokens)
        }
        StoreBackend::Memory => {
            log::warn!("using the in-memory store; data is lost on restart");
            AppState::in_memory(Arc::new(InMemoryStore::default()), tokens)
        }
    };

    match &config.superadmin {
        Some(seed) => {
            state
                .admin
                .seed_superadmin(seed)
                .expect("Failed to seed the superadmin");
        }
        None => log::warn!("SUPERADMIN_ID not set; no superadmin will be seeded"),
    }

    log::info!(
        "Starting server at http://{}:{} ({:?} backend)",
        config.host,
        config.port,
        config.backend
    );

    build_server(state, &config.host, config.port)?.await
}
