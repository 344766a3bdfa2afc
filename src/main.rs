use axum::{
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

use rust_lead_scoring_api::config::Config;
use rust_lead_scoring_api::db::Database;
use rust_lead_scoring_api::handlers::{self, AppState};
use rust_lead_scoring_api::lead_store::LeadStore;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the scoring engine, the optional database
/// connection and the HTTP routes, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lead_scoring_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let engine = config.build_engine()?;
    tracing::info!(
        "Scoring engine ready ({} cities, {} niches, {} sources)",
        engine.tables().cities.len(),
        engine.tables().niches.len(),
        engine.tables().sources.len()
    );

    // Database is optional: without it only body-supplied batches can be scored
    let lead_store = match config.database_url {
        Some(ref url) => {
            let db = Database::new(url).await?;
            tracing::info!("Database connection pool established");
            Some(LeadStore::new(db.pool))
        }
        None => None,
    };

    let app_state = Arc::new(AppState::new(config.clone(), engine, lead_store));
    tracing::info!(
        "Score cache initialized ({}s TTL)",
        config.score_cache_ttl_secs
    );

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = Router::new()
        .route("/api/v1/scoring/score", post(handlers::score_leads))
        .route(
            "/api/v1/scoring/statistics",
            post(handlers::score_statistics),
        )
        .route("/api/v1/scoring/weights", get(handlers::get_weights))
        .route("/api/v1/leads/scores", get(handlers::stored_lead_scores))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
