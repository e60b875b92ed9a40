//! /scan, /kill and /status handlers.

use axum::extract::State;

use thatch_core::wire::{KillResponse, ScanResponse, StatusResponse};

use super::ApiState;
use crate::error::Json;

/// Queue a subnet sweep. `queued` is false only when the scan loop is gone.
pub async fn handle_scan(State(state): State<ApiState>) -> Json<ScanResponse> {
    let queued = state.scan_tx.send(()).is_ok();
    tracing::info!(queued, "scan requested via control plane");
    Json(ScanResponse { queued })
}

pub async fn handle_kill(State(state): State<ApiState>) -> Json<KillResponse> {
    tracing::info!("shutdown requested via control plane");
    // No receivers means shutdown is already under way.
    let _ = state.shutdown_tx.send(());
    Json(KillResponse {
        message: "Shutdown initiated".to_string(),
    })
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(state.node.status())
}
