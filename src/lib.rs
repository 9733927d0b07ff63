//! netverdict -- classifies network connection records as normal or anomalous.
//!
//! This crate provides feature encoding for connection records, model
//! artifact loading, the inference pipeline, a detection history store,
//! and an HTTP API around them.

pub mod api;
pub mod artifacts;
pub mod config;
pub mod detect;
pub mod features;
pub mod model;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::state::AppState;
use crate::artifacts::ArtifactSet;
use crate::config::AppConfig;
use crate::detect::Detector;
use crate::storage::DetectionLog;

/// Load the configured artifacts and build a detector.
pub fn load_detector(config: &AppConfig) -> Result<Detector> {
    let set = ArtifactSet::load(config.artifacts.dir.as_deref())
        .context("Failed to load model artifacts")?;
    let detector = Detector::from_artifacts(set).context("Model artifacts are inconsistent")?;
    Ok(detector)
}

/// Open the detection history database.
pub fn open_detection_log(config: &AppConfig) -> Result<DetectionLog> {
    let pool = storage::open_pool(&config.storage.db_path)
        .with_context(|| format!("Failed to open database {}", config.storage.db_path))?;
    Ok(DetectionLog::new(pool))
}

/// Everything the HTTP handlers share.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    Ok(AppState {
        detector: Arc::new(load_detector(config)?),
        detections: open_detection_log(config)?,
        default_user: Arc::from(config.server.default_user.as_str()),
    })
}

/// Start the netverdict API server.
pub async fn serve(config: &AppConfig) -> Result<()> {
    // 1. Artifacts and storage
    tracing::info!(db_path = %config.storage.db_path, "Initializing database");
    let state = build_state(config)?;

    // 2. API server
    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    let app = api::router(state);

    tracing::info!(%addr, "netverdict listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("netverdict stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
