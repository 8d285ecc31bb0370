//! Roadcare Server - vehicle breakdown occurrence management
//!
//! REST API server for the occurrence repair workflow.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use roadcare_server::{api, config::AppConfig, repository::Repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing; the guard must outlive main for the file writer
    let _guard = init_tracing(&config);

    tracing::info!("Starting Roadcare Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Initialize Redis connection
    let redis_service = roadcare_server::services::redis::RedisService::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");

    tracing::info!("Connected to Redis");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services =
        Services::new(repository, &config, redis_service).expect("Failed to create services");

    // Start the periodic step-opener reconciliation job
    services
        .step_opener
        .clone()
        .spawn(config.jobs.step_opener_period_minutes);

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Configure the tracing subscriber: stdout always, plus a daily-rotated
/// file when `logging.directory` is set.
fn init_tracing(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("roadcare_server={},tower_http=debug", config.logging.level).into()
    });

    let stdout_layer = if config.logging.format == "json" {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let (file_layer, guard) = match &config.logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "roadcare.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Occurrences
        .route("/occurrences", post(api::occurrences::create_occurrence))
        .route("/occurrences/:uuid", get(api::occurrences::get_occurrence))
        .route("/occurrences/:uuid", put(api::occurrences::update_occurrence))
        .route("/occurrences/:uuid", delete(api::occurrences::delete_occurrence))
        .route(
            "/occurrences/:uuid/finalize",
            post(api::occurrences::finalize_occurrence),
        )
        .route(
            "/occurrences/:uuid/steps/transition",
            post(api::occurrences::transition_step),
        )
        .route(
            "/occurrences/:uuid/steps/change",
            post(api::occurrences::change_step),
        )
        // Dispatches
        .route(
            "/occurrences/:uuid/dispatches",
            post(api::dispatches::create_dispatch),
        )
        .route(
            "/occurrences/:uuid/dispatches/:dispatch_uuid/cancel",
            post(api::dispatches::cancel_dispatch),
        )
        .route(
            "/occurrences/:uuid/dispatches/:dispatch_uuid/accept",
            post(api::dispatches::accept_dispatch),
        )
        .route(
            "/occurrences/:uuid/dispatches/:dispatch_uuid/driver",
            post(api::dispatches::assign_driver),
        )
        // Service bay schedules
        .route("/schedules", post(api::service_bays::book_schedule))
        .route("/schedules", get(api::service_bays::list_schedules))
        .route("/schedules/:id", delete(api::service_bays::cancel_schedule))
        .route(
            "/occurrences/:uuid/schedule",
            get(api::service_bays::get_occurrence_schedule),
        )
        // Reviews
        .route("/occurrences/:uuid/reviews", post(api::reviews::create_review))
        .route("/occurrences/:uuid/reviews", get(api::reviews::list_reviews))
        // Imports
        .route("/imports", post(api::imports::import_batch))
        .route("/imports/delete", post(api::imports::delete_batch))
        // Analytics
        .route(
            "/analytics/steps/quantity",
            get(api::analytics::quantity_by_step),
        )
        .route(
            "/analytics/steps/duration",
            get(api::analytics::average_duration_by_step_and_model),
        )
        .route("/analytics/customers", get(api::analytics::stats_by_customer))
        .route(
            "/analytics/dealerships",
            get(api::analytics::stats_by_dealership),
        )
        .route(
            "/analytics/grouped/:dimension",
            get(api::analytics::stats_by_dimension),
        )
        .route("/analytics/totals", get(api::analytics::totals))
        .route(
            "/analytics/operational",
            get(api::analytics::operational_stats),
        )
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
