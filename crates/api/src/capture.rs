//! Auto-capture storage

use bms::{CaptureRequest, CaptureSink};
use gallery::{EventLog, Gallery};
use std::sync::Arc;
use tracing::{info, warn};

/// Stores auto-captures in the gallery and records them in the event log.
/// Writes run on the blocking pool so the analyzer never waits on disk.
pub struct GalleryCaptureSink {
    gallery: Gallery,
    event_log: Arc<EventLog>,
    camera_name: String,
}

impl GalleryCaptureSink {
    pub fn new(gallery: Gallery, event_log: Arc<EventLog>, camera_name: impl Into<String>) -> Self {
        Self {
            gallery,
            event_log,
            camera_name: camera_name.into(),
        }
    }

    /// Save one capture. A failed save is only logged; the capture is not
    /// retried.
    fn store(&self, request: &CaptureRequest) {
        let line = match self
            .gallery
            .save_jpeg(&request.jpeg, &self.camera_name, &request.reason)
        {
            Ok(path) => {
                let line = format!("Auto-captured ({}): {}", request.reason, path.display());
                info!("{}", line);
                line
            }
            Err(e) => {
                let line = format!("Auto-capture ({}) failed: {}", request.reason, e);
                warn!("{}", line);
                line
            }
        };
        if let Err(e) = self.event_log.append(&line) {
            warn!("Event log write failed: {}", e);
        }
    }
}

impl CaptureSink for GalleryCaptureSink {
    fn capture(&self, request: CaptureRequest) {
        let sink = Self {
            gallery: self.gallery.clone(),
            event_log: self.event_log.clone(),
            camera_name: self.camera_name.clone(),
        };
        tokio::task::spawn_blocking(move || sink.store(&request));
    }
}
