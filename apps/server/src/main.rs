mod config;
mod handlers;
mod models;
mod rate_limit;
mod store;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use chrono_tz::Tz;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use rate_limit::{rate_limit_booking, rate_limit_public, RateLimiter};
use store::AvailabilityStore;

pub struct AppState {
    pub store: AvailabilityStore,
    pub timezone: Tz,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            store: AvailabilityStore::new(config),
            timezone: config.timezone,
            started_at: Instant::now(),
        }
    }
}

const RATE_LIMIT_CLEANUP_SECS: u64 = 300;

pub fn build_router(state: Arc<AppState>, limiter: RateLimiter) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let unlimited = Router::new().route("/api/health", get(handlers::health::health));

    let public = Router::new()
        .route("/api/slots", get(handlers::availability::slots))
        .route("/api/slots/week", get(handlers::availability::week))
        .layer(from_fn_with_state(limiter.clone(), rate_limit_public));

    let booking = Router::new()
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .layer(from_fn_with_state(limiter, rate_limit_booking));

    Router::new()
        .merge(unlimited)
        .merge(public)
        .merge(booking)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        timezone = %config.timezone,
        slots_per_day = config.slot_times.len(),
        open_weekdays = config.open_weekdays.len(),
        horizon_days = config.horizon_days,
        "schedule loaded"
    );

    let state = Arc::new(AppState::new(&config));

    let limiter = RateLimiter::with_defaults();
    let cleanup = limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(RATE_LIMIT_CLEANUP_SECS));
        loop {
            interval.tick().await;
            cleanup.cleanup();
        }
    });

    let app = build_router(state, limiter);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("slotbook server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
