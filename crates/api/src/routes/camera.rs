//! Endpoints polled by the viewer: MJPEG stream, events, expression, name

use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use bytes::{BufMut, Bytes, BytesMut};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{wrappers::WatchStream, StreamExt};
use tracing::info;

use super::PinQuery;
use alerting::MJPEG_BOUNDARY;
use crate::{ApiError, AppState};

/// One multipart section carrying a JPEG
fn mjpeg_part(jpeg: &[u8]) -> Bytes {
    let header = format!(
        "\r\n{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        MJPEG_BOUNDARY,
        jpeg.len()
    );
    let mut part = BytesMut::with_capacity(header.len() + jpeg.len());
    part.put_slice(header.as_bytes());
    part.put_slice(jpeg);
    part.freeze()
}

/// Endless `multipart/x-mixed-replace` stream of the newest frames.
/// Slow clients skip frames; paused streaming sends nothing.
pub async fn stream(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<PinQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.check_pin(auth.pin.as_deref())?;
    info!("MJPEG client connected");

    let parts = WatchStream::new(state.frames.subscribe())
        .filter_map(|frame| frame)
        .map(|jpeg| Ok::<_, Infallible>(mjpeg_part(&jpeg)));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                format!("multipart/x-mixed-replace; boundary={}", MJPEG_BOUNDARY),
            ),
            (header::CACHE_CONTROL, "no-cache".to_string()),
            (header::CONNECTION, "close".to_string()),
        ],
        Body::from_stream(parts),
    ))
}

/// Latest pending event message; reading clears it
pub async fn sleep_message(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<PinQuery>,
) -> Result<String, ApiError> {
    state.check_pin(auth.pin.as_deref())?;
    Ok(state.publisher.take_sleep_message())
}

/// Current expression label, `unknown` without a face
pub async fn expression(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<PinQuery>,
) -> Result<&'static str, ApiError> {
    state.check_pin(auth.pin.as_deref())?;
    Ok(state.publisher.current_expression().as_label())
}

pub async fn camera_name(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<PinQuery>,
) -> Result<String, ApiError> {
    state.check_pin(auth.pin.as_deref())?;
    Ok(state.settings.camera_name.clone())
}
