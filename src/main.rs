//! Lending Server - loans, reservations and penalties
//!
//! REST API server for the lending lifecycle of a library.

use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lending_server::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::{MemoryStore, Repository},
    services::{
        notifications::{spawn_dispatcher, ChannelSink},
        scheduler, Services,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting Lending Server v{}", env!("CARGO_PKG_VERSION"));

    let repository = if config.database.is_memory() {
        tracing::warn!("Using the in-process store, data will not survive a restart");
        let store = MemoryStore::new();
        store.seed(&config.database.seed).await;
        tracing::info!(
            "Seeded {} member(s) and {} copy(ies)",
            config.database.seed.members.len(),
            config.database.seed.copies.len()
        );
        Repository::memory(store)
    } else {
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
        Repository::postgres(pool)
    };

    // Notifications are persisted in the background
    let (sink, receiver) = ChannelSink::new();
    spawn_dispatcher(repository.clone(), receiver);

    let services = Services::new(
        repository.clone(),
        config.lending.defaults.clone(),
        Arc::new(sink),
    );

    if config.lending.sweep_interval_secs > 0 {
        scheduler::spawn(services.clone(), config.lending.sweep_interval_secs);
        tracing::info!(
            "Lifecycle sweeps scheduled every {}s",
            config.lending.sweep_interval_secs
        );
    }

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        repository,
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(server_host.parse()?, server_port);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Console output in `pretty` or `json` format, plus an optional daily file
fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lending_server={},tower_http=debug", config.level).into());

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "lending-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if config.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().pretty()).init();
    }

    guard
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Health check
    let health = Router::new()
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .merge(health)
        .nest("/api/v1", api::routes(state))
        .merge(openapi)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}
