use crate::{
    metrics::Metrics,
    services::{media_gate::MediaGate, readiness::ReadinessSignal, storage_service::StorageService},
};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Shared by every handler on both listeners. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub gate: MediaGate,
    pub storage: StorageService,
    pub readiness: ReadinessSignal,
    pub metrics: Metrics,
    /// Cancelled on process shutdown.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        gate: MediaGate,
        storage: StorageService,
        readiness: ReadinessSignal,
        metrics: Metrics,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            gate,
            storage,
            readiness,
            metrics,
            shutdown,
        }
    }

    /// Cancellation scope for one request: fires on shutdown or when the
    /// handler future is dropped (client disconnect).
    pub fn request_scope(&self) -> RequestScope {
        let token = self.shutdown.child_token();
        let guard = token.clone().drop_guard();
        RequestScope {
            token,
            _guard: guard,
        }
    }
}

pub struct RequestScope {
    token: CancellationToken,
    _guard: DropGuard,
}

impl RequestScope {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
