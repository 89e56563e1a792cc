//! Capture gallery
//!
//! Stores captured JPEGs on disk under self-describing file names, lists and
//! filters them, and keeps an append-only event log.

mod log;
mod naming;
mod store;

pub use log::EventLog;
pub use naming::{file_name, korean_expression, parse_file_name, ParsedName, IMAGE_PREFIX};
pub use store::{FilterType, Gallery, SavedImage, MANUAL_CAPTURE_REASON};

use thiserror::Error;

/// Gallery errors
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),
}
