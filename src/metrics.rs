//! Prometheus metrics for the operator listener.
//!
//! The registry is owned by `Metrics` rather than the process-global default
//! one, so independent app instances (tests) never collide on registration.

use crate::services::readiness::ReadinessSignal;
use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    responses: IntCounterVec,
    ready: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let responses = IntCounterVec::new(
            Opts::new("http_response_count", "Responses by handler, method and code"),
            &["code", "handler", "method"],
        )?;
        registry.register(Box::new(responses.clone()))?;

        let ready = IntGauge::new("service_ready", "1 if ready, 0 if not")?;
        registry.register(Box::new(ready.clone()))?;

        Ok(Self {
            registry,
            responses,
            ready,
        })
    }

    pub fn record_response(&self, handler: &str, method: &str, code: u16) {
        let code = code.to_string();
        self.responses
            .with_label_values(&[code.as_str(), handler, method])
            .inc();
    }

    /// Text exposition of every registered metric. The readiness gauge is
    /// refreshed from `readiness` first.
    pub fn render(&self, readiness: &ReadinessSignal) -> Result<(Vec<u8>, String), prometheus::Error> {
        self.ready.set(i64::from(readiness.is_ready()));

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((buffer, encoder.format_type().to_string()))
    }
}

/// Route-layer middleware counting responses per matched route.
pub async fn track_responses(
    State(metrics): State<Metrics>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let method = req.method().as_str().to_string();
    let handler = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;
    metrics.record_response(&handler, &method, response.status().as_u16());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exposition(metrics: &Metrics, readiness: &ReadinessSignal) -> String {
        let (body, content_type) = metrics.render(readiness).unwrap();
        assert!(content_type.starts_with("text/plain"));
        String::from_utf8(body).unwrap()
    }

    #[test]
    fn test_gauge_follows_signal() {
        let metrics = Metrics::new().unwrap();
        let readiness = ReadinessSignal::default();

        assert!(exposition(&metrics, &readiness).contains("service_ready 1"));
        readiness.set(false);
        assert!(exposition(&metrics, &readiness).contains("service_ready 0"));
    }

    #[test]
    fn test_responses_are_labelled() {
        let metrics = Metrics::new().unwrap();
        metrics.record_response("/show", "GET", 500);
        metrics.record_response("/show", "GET", 500);

        let text = exposition(&metrics, &ReadinessSignal::default());
        let line = text
            .lines()
            .find(|l| l.starts_with("http_response_count{"))
            .unwrap();
        assert!(line.contains(r#"code="500""#));
        assert!(line.contains(r#"handler="/show""#));
        assert!(line.contains(r#"method="GET""#));
        assert!(line.ends_with(" 2"));
    }

    #[test]
    fn test_instances_do_not_share_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_response("/", "GET", 200);
        let text = exposition(&b, &ReadinessSignal::default());
        assert!(!text.contains("http_response_count{"));
    }
}
