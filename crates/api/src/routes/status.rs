//! Status, event log and metrics

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use bms::{MonitorEvent, StatusSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::PinQuery;
use crate::{ApiError, AppState};

/// Latest analysis state plus device flags
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub snapshot: StatusSnapshot,
    /// Event waiting for the viewer; reading status does not consume it
    pub pending_event: Option<MonitorEvent>,
    pub camera_name: String,
    pub streaming: bool,
    pub analyzer_running: bool,
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<PinQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.check_pin(auth.pin.as_deref())?;
    Ok(Json(StatusResponse {
        snapshot: state.publisher.snapshot(),
        pending_event: state.publisher.peek_event(),
        camera_name: state.settings.camera_name.clone(),
        streaming: state.frames.is_streaming(),
        analyzer_running: state.analyzer.as_ref().is_some_and(|a| a.is_running()),
    }))
}

/// Query parameters for the logs endpoint
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub lines: Vec<String>,
    pub count: usize,
}

/// Tail of the event log, oldest first
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<PinQuery>,
    Query(params): Query<LogQuery>,
) -> Result<Json<LogResponse>, ApiError> {
    state.check_pin(auth.pin.as_deref())?;
    let lines = state.event_log.tail(params.limit)?;
    Ok(Json(LogResponse {
        count: lines.len(),
        lines,
    }))
}

/// Prometheus exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Metrics recorder not installed".into()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
