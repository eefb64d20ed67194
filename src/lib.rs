pub mod application;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;
pub mod state;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use db::{create_pool, DbPool};
pub use state::AppState;

use domain::errors::DomainError;
use errors::AppError;
use handlers::{admin, listings, orders, payments, ApiDoc};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), DomainError> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DomainError::Internal(format!("migrations failed: {}", e)))?;
    log::info!("{} pending migration(s) applied", applied.len());
    Ok(())
}

/// Registers every route. Literal segments (`/orders/buyer`, `/listings/mine`)
/// are registered before the `{id}` routes they would otherwise collide with.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid request body: {}", err)).into()
    }))
    .service(
        web::scope("/orders")
            .route("", web::post().to(orders::place_order))
            .route("/buyer", web::get().to(orders::buyer_orders))
            .route("/farmer", web::get().to(orders::farmer_orders))
            .route("/{id}", web::get().to(orders::get_order)),
    )
    .service(
        web::scope("/payments")
            .route("/farmer/{farmerId}/revenue", web::get().to(payments::farmer_revenue)),
    )
    .service(
        web::scope("/listings")
            .route("", web::get().to(listings::browse_listings))
            .route("", web::post().to(listings::create_listing))
            .route("/mine", web::get().to(listings::my_listings))
            .route("/{id}", web::get().to(listings::get_listing))
            .route("/{id}", web::put().to(listings::update_listing))
            .route("/{id}", web::delete().to(listings::delete_listing)),
    )
    .service(
        web::scope("/admin")
            .route("/users", web::get().to(admin::list_users))
            .route("/users/{id}/approve", web::put().to(admin::approve_user))
            .route("/users/{id}/reject", web::put().to(admin::reject_user))
            .route("/users/{id}", web::delete().to(admin::remove_user))
            .route("/listings", web::get().to(admin::list_listings))
            .route("/listings/{id}/approve", web::put().to(admin::approve_listing))
            .route("/listings/{id}/reject", web::put().to(admin::reject_listing))
            .route("/listings/{id}", web::delete().to(admin::delete_listing))
            .route("/orders", web::get().to(admin::list_orders))
            .route("/analytics", web::get().to(admin::analytics)),
    );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(state);
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
