pub mod routes;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::monitor_handle::MonitorHandle;
use crate::notifier::Notifier;
use crate::readiness::Readiness;
use crate::venues::VenueRouter;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<VenueRouter>,
    pub monitor_handle: Arc<MonitorHandle>,
    pub notifier: Arc<dyn Notifier>,
    pub readiness: Arc<RwLock<Readiness>>,
}

pub fn router(state: AppState) -> axum::Router {
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;

    axum::Router::new()
        .route("/health", get(routes::health))
        .route("/api/status", get(routes::status))
        .route("/api/current_time", get(routes::current_time))
        .route("/api/orderbook", get(routes::orderbook))
        .route("/api/balance", get(routes::balance))
        .route("/api/trading/start", post(routes::trading_start))
        .route("/api/trading/stop", post(routes::trading_stop))
        .route("/api/trading/status", get(routes::trading_status))
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(crate::middleware::logging::request_logging))
        .with_state(state)
}
