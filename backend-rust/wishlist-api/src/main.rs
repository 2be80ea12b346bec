use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;

use wishlist_api::api::{self, AppState};
use wishlist_api::auth::AuthService;
use wishlist_api::config::Config;
use wishlist_api::mail::Mailer;
use wishlist_api::store::Store;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    // Initialize store
    let store = Arc::new(Store::new(&config.database_path).map_err(|e| {
        log::error!("Failed to initialize database: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?);

    let auth_service = Arc::new(
        AuthService::new(config.jwt_secret.clone())
            .with_token_ttl(chrono::Duration::days(config.token_ttl_days))
            .with_bcrypt_cost(config.bcrypt_cost),
    );

    if config.mail_webhook_url.is_none() {
        log::warn!("MAIL_WEBHOOK_URL not set, outgoing mail will only be logged");
    }
    let mailer = Arc::new(Mailer::new(
        config.mail_webhook_url.clone(),
        config.mail_from.clone(),
    ));

    let user_count = store.count_users().unwrap_or(0);
    log::info!("Database: {} ({} users)", config.database_path, user_count);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            // AuthService on its own for the bearer-token extractor
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(AppState::new(
                store.clone(),
                auth_service.clone(),
                mailer.clone(),
            )))
            .configure(api::configure_routes)
    })
    .workers(config.workers);

    log::info!(
        "Starting wishlist-api server on {}:{}",
        config.bind_addr,
        config.port
    );

    server.bind((config.bind_addr.as_str(), config.port))?.run().await
}
