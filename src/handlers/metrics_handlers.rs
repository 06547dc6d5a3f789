//! Prometheus scrape endpoint, served on the private listener only.

use crate::{errors::AppError, state::AppState};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, header},
    response::Response,
};

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let (buffer, content_type) = state
        .metrics
        .render(&state.readiness)
        .map_err(|err| AppError::internal(err.to_string()))?;

    let mut response = Response::new(Body::from(buffer));
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Ok(response)
}
