// GET handlers. Bad input never fails a query: unknown periods fall back to 24h and a bad
// limit falls back to DEFAULT_TOP_LIMIT. Only store errors surface, as 500.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::{AppState, DEFAULT_TOP_LIMIT};
use crate::version::{NAME, VERSION};

#[derive(Debug, Deserialize)]
pub(super) struct TopAppsParams {
    period: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TotalsParams {
    period: Option<String>,
}

fn store_error(operation: &str, e: anyhow::Error) -> Response {
    tracing::warn!(error = %e, operation, "query failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

/// GET /ping: liveness probe.
pub(super) async fn ping_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.query.ping()
}

/// GET /live: current rate table, unordered.
pub(super) async fn live_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(state.query.live_snapshot())
}

/// GET /top: top applications by rx+tx over the period.
pub(super) async fn top_apps_handler(
    State(state): State<AppState>,
    Query(params): Query<TopAppsParams>,
) -> Response {
    let period = params.period.unwrap_or_default();
    let limit = params
        .limit
        .and_then(|l| l.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_TOP_LIMIT);
    match state.query.top_apps(&period, limit).await {
        Ok(apps) => axum::Json(apps).into_response(),
        Err(e) => store_error("top_apps", e),
    }
}

/// GET /totals: `rx,tx` over the period.
pub(super) async fn totals_handler(
    State(state): State<AppState>,
    Query(params): Query<TotalsParams>,
) -> Response {
    let period = params.period.unwrap_or_default();
    match state.query.totals(&period).await {
        Ok(totals) => totals.to_string().into_response(),
        Err(e) => store_error("totals", e),
    }
}

/// GET /health: service identity and collector state.
pub(super) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let collector = *state.health.borrow();
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
        "collector": collector,
    }))
}
