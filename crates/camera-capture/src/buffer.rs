//! Latest-frame buffer for MJPEG streaming
//!
//! Holds only the most recent encoded frame. Readers that fall behind skip
//! straight to the newest frame instead of queueing.

use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info};

/// Shared holder of the newest JPEG frame
pub struct FrameBuffer {
    tx: watch::Sender<Option<Bytes>>,
    streaming: AtomicBool,
}

impl FrameBuffer {
    /// Create an empty buffer with streaming enabled
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            streaming: AtomicBool::new(true),
        }
    }

    /// Replace the current frame. Returns false while streaming is paused.
    pub fn publish(&self, jpeg: Bytes) -> bool {
        if !self.is_streaming() {
            return false;
        }
        debug!("New frame updated, size: {} bytes", jpeg.len());
        self.tx.send_replace(Some(jpeg));
        true
    }

    /// Newest frame, if any
    pub fn latest(&self) -> Option<Bytes> {
        self.tx.borrow().clone()
    }

    /// Receiver that wakes on every frame change
    pub fn subscribe(&self) -> watch::Receiver<Option<Bytes>> {
        self.tx.subscribe()
    }

    /// Pause or resume streaming. Pausing drops the held frame.
    pub fn set_streaming(&self, active: bool) {
        self.streaming.store(active, Ordering::Release);
        if !active {
            self.tx.send_replace(None);
        }
        info!("Streaming {}", if active { "started" } else { "stopped" });
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_wins() {
        let buffer = FrameBuffer::new();
        assert!(buffer.latest().is_none());

        buffer.publish(Bytes::from_static(b"first"));
        buffer.publish(Bytes::from_static(b"second"));
        assert_eq!(buffer.latest().unwrap(), Bytes::from_static(b"second"));
    }

    #[test]
    fn test_pause_clears_and_rejects() {
        let buffer = FrameBuffer::new();
        buffer.publish(Bytes::from_static(b"frame"));

        buffer.set_streaming(false);
        assert!(buffer.latest().is_none());
        assert!(!buffer.publish(Bytes::from_static(b"dropped")));
        assert!(buffer.latest().is_none());

        buffer.set_streaming(true);
        assert!(buffer.publish(Bytes::from_static(b"again")));
    }

    #[tokio::test]
    async fn test_subscriber_sees_newest() {
        let buffer = FrameBuffer::new();
        let mut rx = buffer.subscribe();

        buffer.publish(Bytes::from_static(b"a"));
        buffer.publish(Bytes::from_static(b"b"));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().clone().unwrap(), Bytes::from_static(b"b"));
    }
}
