mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::config::Settings;
use crate::core::{RandomRequesterSelection, Router};
use crate::routes::routing::AppState;
use crate::services::{
    CounterKey, CounterStore, PostgresDecisionLog, RedisCounterStore, RegistryClient,
};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(
    err: error::JsonPayloadError,
    req: &actix_web::HttpRequest,
) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(
    err: error::QueryPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        panic!("Configuration error: {}", e);
    });

    // Initialize logging; LOG_LEVEL and LOG_FORMAT take precedence over the file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format =
        std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Sesh Router session routing service...");
    info!("Configuration loaded successfully");

    // Connect the shared session counter store
    let counters: Arc<dyn CounterStore> = match RedisCounterStore::new(&settings.redis.url).await {
        Ok(store) => {
            info!("Counter store connected");
            Arc::new(store)
        }
        Err(e) => {
            error!("Failed to connect to Redis ({}): {}", settings.redis.url, e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "Redis connection required",
            ));
        }
    };

    // Connect the registry
    let db_max_conn = settings.database.max_connections.unwrap_or(10);
    let db_min_conn = settings.database.min_connections.unwrap_or(1);

    let registry = Arc::new(
        RegistryClient::new(&settings.database.url, db_max_conn, db_min_conn)
            .await
            .unwrap_or_else(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                panic!("PostgreSQL connection error: {}", e);
            }),
    );

    info!("Registry client initialized (max: {} connections)", db_max_conn);

    // Load the reference records
    let roster = registry.load_roster().await.unwrap_or_else(|e| {
        error!("Failed to load reference records: {}", e);
        panic!("Roster load error: {}", e);
    });

    // Seed a counter for every worker; counts from a previous run are kept
    for worker in &roster.workers {
        if let Err(e) = counters
            .set_if_absent(&CounterKey::sessions(worker.worker_id), 0)
            .await
        {
            error!(
                "Failed to initialize session counter for worker {}: {}",
                worker.worker_id, e
            );
        }
    }

    let decisions = Arc::new(PostgresDecisionLog::new(registry.pool()));
    let router = Arc::new(Router::new(
        counters.clone(),
        decisions,
        Arc::new(RandomRequesterSelection),
    ));

    info!("Router initialized");

    // Build application state
    let app_state = AppState {
        router,
        counters,
        registry,
        roster: Arc::new(RwLock::new(roster)),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
