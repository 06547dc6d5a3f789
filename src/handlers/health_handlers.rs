//! Health handler.
//!
//! - GET /ping -> 200 while ready, 418 while the readiness signal is down

use crate::state::AppState;
use axum::{extract::State, http::StatusCode};

/// Distinct from any 5xx so monitoring can tell "deliberately not ready"
/// apart from a failing server.
pub const NOT_READY_STATUS: StatusCode = StatusCode::IM_A_TEAPOT;

/// `GET /ping`
///
/// Reads the readiness signal without blocking; no body.
pub async fn ping(State(state): State<AppState>) -> StatusCode {
    if state.readiness.is_ready() {
        StatusCode::OK
    } else {
        NOT_READY_STATUS
    }
}
