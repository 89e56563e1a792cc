//! Manual capture, streaming and lens control

use axum::{
    extract::{Query, State},
    Json,
};
use camera_capture::CameraFacing;
use gallery::MANUAL_CAPTURE_REASON;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::PinQuery;
use crate::{append_log, ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub file_name: String,
    pub path: String,
}

/// Save the newest streamed frame to the gallery
pub async fn capture(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<PinQuery>,
) -> Result<Json<CaptureResponse>, ApiError> {
    state.check_pin(auth.pin.as_deref())?;
    let jpeg = state
        .frames
        .latest()
        .ok_or_else(|| ApiError::Unavailable("No frame available".into()))?;

    let gallery = state.gallery.clone();
    let camera_name = state.settings.camera_name.clone();
    let path = tokio::task::spawn_blocking(move || {
        gallery.save_jpeg(&jpeg, &camera_name, MANUAL_CAPTURE_REASON)
    })
    .await??;

    let path_text = path.display().to_string();
    info!("Manual capture: {}", path_text);
    append_log(&state.event_log, vec![format!("Manual capture: {}", path_text)]).await?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    Ok(Json(CaptureResponse {
        file_name,
        path: path_text,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StreamingQuery {
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct StreamingResponse {
    pub streaming: bool,
}

/// Pause or resume the MJPEG stream
pub async fn set_streaming(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<PinQuery>,
    Query(params): Query<StreamingQuery>,
) -> Result<Json<StreamingResponse>, ApiError> {
    state.check_pin(auth.pin.as_deref())?;
    let active = params
        .active
        .ok_or_else(|| ApiError::BadRequest("Missing 'active'".into()))?;
    state.frames.set_streaming(active);
    Ok(Json(StreamingResponse {
        streaming: state.frames.is_streaming(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CameraQuery {
    pub facing: Option<CameraFacing>,
}

#[derive(Debug, Serialize)]
pub struct CameraResponse {
    pub facing: CameraFacing,
}

/// Switch lens; analysis state restarts from scratch
pub async fn switch_camera(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<PinQuery>,
    Query(params): Query<CameraQuery>,
) -> Result<Json<CameraResponse>, ApiError> {
    state.check_pin(auth.pin.as_deref())?;
    let facing = params
        .facing
        .ok_or_else(|| ApiError::BadRequest("Missing 'facing' (front or back)".into()))?;
    let analyzer = state
        .analyzer
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Analyzer not running".into()))?;

    analyzer.switch_camera(facing);
    append_log(&state.event_log, vec![format!("Camera switched to {:?}", facing)]).await?;
    Ok(Json(CameraResponse { facing }))
}
