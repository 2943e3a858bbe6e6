// HTTP query routes (local transport for the four query operations + collector health)

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

use crate::models::CollectorHealth;
use crate::query::QueryService;

/// `limit` used by /top when the caller omits it or sends something unparseable.
pub const DEFAULT_TOP_LIMIT: usize = 10;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) query: Arc<QueryService>,
    pub(crate) health: watch::Receiver<CollectorHealth>,
}

pub fn app(query: Arc<QueryService>, health: watch::Receiver<CollectorHealth>) -> Router {
    let state = AppState { query, health };
    Router::new()
        .route("/ping", get(http::ping_handler)) // GET /ping
        .route("/live", get(http::live_handler)) // GET /live
        .route("/top", get(http::top_apps_handler)) // GET /top?period=&limit=
        .route("/totals", get(http::totals_handler)) // GET /totals?period=
        .route("/health", get(http::health_handler)) // GET /health
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
