use anyhow::{Context, Result};
use photo_gate::{
    config::AppConfig,
    metrics::Metrics,
    routes::routes::{private_routes, public_routes},
    services::{
        media_gate::{ContrastSharpen, MediaGate},
        naming::TimestampNames,
        readiness::{Oscillator, RandomDelays, ReadinessSignal},
        storage_service::StorageService,
    },
    state::AppState,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;
    tracing::info!("Starting photo-gate with config: {:?}", cfg);

    // --- Initialize core services ---
    let storage = StorageService::s3(&cfg.s3_settings(), Arc::new(TimestampNames))?;
    let gate = MediaGate::new(
        Arc::new(ContrastSharpen::default()),
        cfg.max_upload_bytes,
        cfg.jpeg_quality,
    );
    let metrics = Metrics::new().context("registering metrics")?;
    let readiness = ReadinessSignal::default();
    let shutdown = CancellationToken::new();
    let state = AppState::new(gate, storage, readiness.clone(), metrics, shutdown.clone());

    // --- Readiness oscillator ---
    let oscillator = Oscillator::new(readiness, RandomDelays::new(cfg.max_ready), cfg.not_ready)
        .spawn(shutdown.clone());

    // --- Bind both listeners before serving anything ---
    let public = TcpListener::bind(&cfg.listen_public)
        .await
        .with_context(|| format!("binding public listener {}", cfg.listen_public))?;
    let private = TcpListener::bind(&cfg.listen_private)
        .await
        .with_context(|| format!("binding private listener {}", cfg.listen_private))?;
    tracing::info!("Gallery listening on http://{}", public.local_addr()?);
    tracing::info!("Metrics listening on http://{}", private.local_addr()?);

    tokio::spawn(shutdown_signal(shutdown.clone()));

    let public_server = axum::serve(public, public_routes(state.clone()))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned());
    let private_server = axum::serve(private, private_routes(state))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned());

    let served = tokio::try_join!(public_server.into_future(), private_server.into_future());

    // --- Teardown ---
    shutdown.cancel();
    oscillator.await.context("readiness oscillator panicked")?;
    served?;
    tracing::info!("photo-gate stopped");

    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = shutdown.cancelled() => return,
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
