mod attachment_upload;
mod config;
mod errors;
mod form;
mod handlers;
mod models;
mod phone;
mod record_store;
mod schema_lookup;
mod webhook_notifier;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::handlers::{AppState, MAX_REQUEST_BYTES};

/// Main entry point for the application.
///
/// Initializes logging, loads configuration, builds the external API
/// clients and shared state, and starts the Axum server with rate limiting
/// and CORS in front of the submission endpoint.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intake_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Build application state (external API clients share it)
    let app_state = Arc::new(AppState::from_config(config.clone())?);
    tracing::info!("External API clients initialized");

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Submission route behind the security layers
    let protected_routes = Router::new()
        .route("/api/submit", post(handlers::submit))
        .layer(
            ServiceBuilder::new()
                // Uploads can be large; cap the body well above the 5MB
                // direct-attach limit so token uploads still pass
                .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting for platform probes
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
