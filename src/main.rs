//! multibank - Multi-currency banking backend API
//!
//! User accounts in multiple currencies, a double-entry operation ledger,
//! and a scheduled refresh of exchange rates from the central bank feed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use multibank::api::{self, AppState};
use multibank::auth::SessionAuthProvider;
use multibank::db;
use multibank::jobs::{JobScheduler, JobSchedulerConfig};
use multibank::notify::LogNotifier;
use multibank::rates::CbrClient;
use multibank::Config;

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multibank=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the application router
fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check (no auth)
        .route("/health", get(health_check))
        .merge(api::create_router(state))
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Starting multibank server");
    tracing::info!("Connecting to database...");

    // Create database pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    // Verify database schema
    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    let rates = Arc::new(CbrClient::new(config.rates_url.clone())?);

    let state = AppState {
        pool: pool.clone(),
        auth: Arc::new(SessionAuthProvider::new(
            pool.clone(),
            config.session_ttl_minutes,
        )),
        notifier: Arc::new(LogNotifier),
        rates: rates.clone(),
    };

    // Daily rate refresh and session cleanup run alongside request handling.
    let scheduler = JobScheduler::with_config(
        pool.clone(),
        rates,
        JobSchedulerConfig {
            rates_refresh_interval: Duration::from_secs(config.rates_refresh_interval_secs),
            ..JobSchedulerConfig::default()
        },
    );
    let scheduler_handle = scheduler.start();

    tracing::info!("Listening on http://{}", addr);

    // Build router and start server
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    scheduler_handle.abort();
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
