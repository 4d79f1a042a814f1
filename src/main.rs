use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use salonbook::config::AppConfig;
use salonbook::db;
use salonbook::handlers;
use salonbook::services::api::http::HttpBookingApi;
use salonbook::services::clock::SystemClock;
use salonbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;

    let conn = db::init_db(&config.database_url)?;

    tracing::info!("using booking backend at {}", config.api_base_url);
    let api = Arc::new(HttpBookingApi::new(config.api_base_url.clone()));

    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(Mutex::new(conn)),
        api,
        Arc::new(SystemClock),
    )?);

    let sweeper = state.clone();
    let max_idle = Duration::from_secs(config.wizard_idle_minutes * 60);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            sweeper.evict_idle_wizards(max_idle).await;
        }
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/services", get(handlers::services::list_services))
        .route("/api/session", get(handlers::session::get_session))
        .route("/api/session/login", post(handlers::session::login))
        .route("/api/session/logout", post(handlers::session::logout))
        .route("/api/session/events", get(handlers::session::events_stream))
        .route("/api/wizards", post(handlers::wizard::create_wizard))
        .route(
            "/api/wizards/:id",
            get(handlers::wizard::get_wizard).delete(handlers::wizard::close_wizard),
        )
        .route("/api/wizards/:id/service", post(handlers::wizard::select_service))
        .route("/api/wizards/:id/date", post(handlers::wizard::select_date))
        .route(
            "/api/wizards/:id/slots/refresh",
            post(handlers::wizard::refresh_slots),
        )
        .route("/api/wizards/:id/time", post(handlers::wizard::select_time))
        .route("/api/wizards/:id/details", post(handlers::wizard::update_details))
        .route("/api/wizards/:id/next", post(handlers::wizard::next_step))
        .route("/api/wizards/:id/back", post(handlers::wizard::previous_step))
        .route("/api/wizards/:id/reset", post(handlers::wizard::reset))
        .route("/api/wizards/:id/confirm", post(handlers::wizard::confirm))
        .route(
            "/api/wizards/:id/calendar.ics",
            get(handlers::calendar::download_ics),
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
