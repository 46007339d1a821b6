use std::sync::Arc;

use actix::Actor;
use actix_web::http::StatusCode;
use actix_web::middleware::{ErrorHandlers, Logger};
use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};
use env_logger::Env;
use log::info;
use serde_json::json;

use feed_backend::config::{AppConfig, StoreBackend};
use feed_backend::database;
use feed_backend::feed::server::FeedServer;
use feed_backend::middleware::auth::create_token;
use feed_backend::middleware::not_found::not_found;
use feed_backend::post::memory_store::InMemoryPostStore;
use feed_backend::post::post_service::PostService;
use feed_backend::post::post_store::{MongoPostStore, PostStore};
use feed_backend::router::index::routes;
use feed_backend::user::model::User;
use feed_backend::utils::helpers::service_name;
use feed_backend::utils::uploads::ImageStore;

#[get("/")]
async fn default() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Feed service is running",
        "httpStatusCode": StatusCode::OK.as_u16(),
        "service": service_name(),
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();

    let store: Arc<dyn PostStore> = match config.store_backend {
        StoreBackend::Mongo => {
            let client = database::connect_to_mongo(&config)
                .await
                .map_err(|e| std::io::Error::other(format!("Failed to connect to MongoDB: {}", e)))?;
            Arc::new(MongoPostStore::new(&client, &config.database_name))
        }
        StoreBackend::Memory => {
            log::warn!("Using in-memory store; data is lost on restart");
            let store = InMemoryPostStore::new();
            let demo = User::new("Demo User", "demo@example.com");
            match create_token(&demo.id.to_hex(), &config.jwt_secret) {
                Ok(token) => info!("Demo user {} token: {}", demo.id, token),
                Err(e) => log::error!("Failed to issue demo token: {}", e),
            }
            store.insert_user(demo).await;
            Arc::new(store)
        }
    };

    let feed_server = FeedServer::new().start();
    let images = ImageStore::new(config.image_root.clone());
    info!("Serving images from {}", images.base_dir().display());

    let post_service = web::Data::new(PostService::new(
        store,
        images,
        Arc::new(feed_server.clone()),
    ));

    let bind = (config.host.clone(), config.port);
    info!("Starting server on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(config.clone()))
            .app_data(post_service.clone())
            .app_data(web::Data::new(feed_server.clone()))
            .configure(routes)
            .wrap(ErrorHandlers::new().handler(StatusCode::NOT_FOUND, not_found))
            .service(default)
    })
    .bind(bind)?
    .run()
    .await?;

    info!("Server has stopped");

    Ok(())
}
