//! Gallery browsing and deletion

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use gallery::{FilterType, SavedImage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::PinQuery;
use crate::{ApiError, AppState};

/// Query parameters for the gallery listing
#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    /// `baby_name`, `year`, `month`, `day` or `expression`
    pub filter: Option<String>,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub images: Vec<GalleryEntry>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct GalleryEntry {
    #[serde(flatten)]
    pub image: SavedImage,
    pub display_timestamp: String,
}

/// Captures, newest first, optionally filtered
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<PinQuery>,
    Query(params): Query<GalleryQuery>,
) -> Result<Json<GalleryResponse>, ApiError> {
    state.check_pin(auth.pin.as_deref())?;
    let images = match params.filter.as_deref().filter(|f| !f.is_empty()) {
        Some(filter) => state
            .gallery
            .filter(filter.parse::<FilterType>()?, &params.value)?,
        None => state.gallery.list()?,
    };

    let images: Vec<GalleryEntry> = images
        .into_iter()
        .map(|image| GalleryEntry {
            display_timestamp: image.display_timestamp(),
            image,
        })
        .collect();
    Ok(Json(GalleryResponse {
        count: images.len(),
        images,
    }))
}

/// Raw JPEG of one capture
pub async fn image(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(auth): Query<PinQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.check_pin(auth.pin.as_deref())?;
    let bytes = state
        .gallery
        .read(&name)?
        .ok_or_else(|| ApiError::NotFound(format!("No capture named {}", name)))?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(auth): Query<PinQuery>,
) -> Result<StatusCode, ApiError> {
    state.check_pin(auth.pin.as_deref())?;
    if state.gallery.delete(&name)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("No capture named {}", name)))
    }
}
