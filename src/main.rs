use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chairside::config::AppConfig;
use chairside::db;
use chairside::handlers;
use chairside::services::calendar::HttpCalendarProvider;
use chairside::services::matcher::DentalMatcher;
use chairside::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let calendar = HttpCalendarProvider::new(
        config.calendar_api_url.clone(),
        config.calendar_api_key.clone(),
    );
    tracing::info!("calendar service at {}", config.calendar_api_url);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        matcher: DentalMatcher::with_defaults(),
        calendar: Box::new(calendar),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook/voice", post(handlers::webhook::voice_webhook))
        .route(
            "/webhook/analyze",
            post(handlers::webhook::analyze_transcript),
        )
        .route("/api/practices", post(handlers::admin::upsert_practice))
        .route("/api/practices/:id", get(handlers::admin::get_practice))
        .route(
            "/api/practices/:id/availability",
            get(handlers::admin::check_availability),
        )
        .route("/api/calls", get(handlers::admin::list_calls))
        .route(
            "/api/appointments",
            post(handlers::admin::create_appointment),
        )
        .route(
            "/api/appointments/:id/cancel",
            post(handlers::admin::cancel_appointment),
        )
        .route(
            "/api/appointments/:id/reschedule",
            post(handlers::admin::reschedule_appointment),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
