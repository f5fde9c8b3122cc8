//! ride-dispatch server entry point.
//!
//! Connects to PostgreSQL, starts the background dispatcher, and serves
//! the REST API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ride_dispatch::api;
use ride_dispatch::app_state::AppState;
use ride_dispatch::config::ServiceConfig;
use ride_dispatch::payment::{HttpPaymentGateway, MeteredFare, RetryPolicy};
use ride_dispatch::persistence::PostgresStore;
use ride_dispatch::service::spawn_dispatch_loop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ServiceConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(addr = %config.listen_addr, "starting ride-dispatch");

    // Persistence
    let store = PostgresStore::connect(&config)
        .await
        .context("connecting to PostgreSQL")?;
    if config.run_migrations {
        store.migrate().await.context("applying migrations")?;
        tracing::info!("database migrations applied");
    }

    // Payment gateway
    let gateway = HttpPaymentGateway::new(
        &config.payment_gateway_url,
        config.payment_request_timeout(),
    )?;
    tracing::info!(url = %gateway.payments_url(), "payment gateway configured");

    // Build application state
    let app_state = AppState::new(
        Arc::new(store),
        Arc::new(gateway),
        Arc::new(MeteredFare::new(config.fare_initial, config.fare_per_distance)),
        RetryPolicy::new(config.payment_max_retries, config.payment_retry_delay()),
        config.dispatch_batch_size,
    );

    // Background dispatcher
    let dispatcher = config
        .dispatch_interval()
        .map(|period| spawn_dispatch_loop(Arc::clone(&app_state.dispatch), period));
    if dispatcher.is_none() {
        tracing::info!("background dispatch disabled, waiting for triggers");
    }

    // Build router
    let app = Router::new().merge(api::build_router());

    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", ride_dispatch::openapi::ApiDoc::openapi()),
        )
    };

    let app = app
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.http_request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = dispatcher {
        handle.abort();
    }
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
}
