//! Defines the two routers the service exposes.
//!
//! ## Public listener
//!   - `GET  /`      — gallery page
//!   - `POST /`      — upload (multipart field `photo`), then gallery page
//!   - `GET  /show`  — stream one stored object (`?name=`)
//!   - `GET  /ping`  — readiness probe (200 or 418)
//!
//! ## Private listener
//!   - `GET  /metrics` — Prometheus exposition; keep off untrusted networks

use crate::{
    handlers::{
        gallery_handlers::{index, show, upload},
        health_handlers::ping,
        metrics_handlers::metrics,
    },
    metrics::track_responses,
    state::AppState,
};
use axum::{Router, extract::DefaultBodyLimit, middleware, routing::get};

/// Room for multipart boundaries and part headers around the file itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the user-facing router. Only `/` and `/show` are counted in
/// `http_response_count`.
pub fn public_routes(state: AppState) -> Router {
    let body_limit = state.gate.max_upload_bytes() + FORM_OVERHEAD_BYTES;

    let counted = Router::new()
        .route("/", get(index).post(upload))
        .route("/show", get(show))
        .route_layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_responses,
        ));

    Router::new()
        .merge(counted)
        .route("/ping", get(ping))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Build the operator router.
pub fn private_routes(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .with_state(state)
}
