//! Viewer-side alerting
//!
//! Polls the camera device for new events and decides which of them reach
//! the parent: per-event preferences plus suppression of repeats.

mod filter;
mod poller;

pub use filter::{NotificationFilter, NotificationPreferences, MJPEG_BOUNDARY};
pub use poller::{LogNotifier, NotificationPoller, Notifier, ViewerClient, MAX_RESPONSE_BYTES};

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid PIN")]
    Unauthorized,

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Configuration error: {0}")]
    Config(String),
}
