use std::io;

use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use diesel_migrations::MigrationHarness;

use catalog_categories::auth::AuthConfig;
use catalog_categories::db::{MIGRATIONS, establish_connection_pool};
use catalog_categories::models::config::ServerConfig;
use catalog_categories::repository::DieselRepository;
use catalog_categories::routes;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let server_config = ServerConfig::load().map_err(|e| {
        log::error!("Failed to load configuration: {e}");
        io::Error::other(e)
    })?;

    if server_config.jwt_secret.is_empty() {
        log::error!("jwt_secret is not configured, set APP_JWT_SECRET");
        return Err(io::Error::other("jwt_secret is not configured"));
    }

    let pool = establish_connection_pool(&server_config.database_url).map_err(|e| {
        log::error!("Failed to open database {}: {e}", server_config.database_url);
        io::Error::other(e)
    })?;

    {
        let mut conn = pool.get().map_err(io::Error::other)?;
        let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            log::error!("Failed to run migrations: {e}");
            io::Error::other(e.to_string())
        })?;
        if !applied.is_empty() {
            log::info!("Applied {} migrations", applied.len());
        }
    }

    let repo = web::Data::new(DieselRepository::new(pool));
    let auth_config = web::Data::new(AuthConfig::new(&server_config.jwt_secret));
    let bind_address = (server_config.address.clone(), server_config.port);

    log::info!(
        "Starting server on {}:{}",
        server_config.address,
        server_config.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(repo.clone())
            .app_data(auth_config.clone())
            .configure(routes::configure)
    })
    .bind(bind_address)?
    .run()
    .await
}
