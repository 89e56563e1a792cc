//! Frame sources

use crate::{yuv420_to_rgb, CameraConfig, CameraError, VideoFrame, YuvPlanes};
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};
use tracing::info;

/// Anything that yields frames at its own pace
pub trait FrameSource: Send {
    /// Wait for and return the next frame
    fn next_frame(&mut self) -> impl Future<Output = Result<VideoFrame, CameraError>> + Send;
}

/// Synthetic YUV420 source producing a sweeping luma bar.
/// Used when no camera hardware is attached.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    ticker: Interval,
    sequence: u32,
    /// Frame timestamps count from here
    started: Instant,
}

impl TestPatternSource {
    pub fn new(config: &CameraConfig) -> Self {
        let fps = config.fps.max(1);
        let mut ticker = interval(Duration::from_millis(1000 / fps as u64));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            "Test pattern source {}x{} @ {} fps",
            config.width, config.height, fps
        );
        Self {
            width: config.width.max(2),
            height: config.height.max(2),
            ticker,
            sequence: 0,
            started: Instant::now(),
        }
    }

    fn render(&self, timestamp_ms: u64) -> Result<VideoFrame, CameraError> {
        let (w, h) = (self.width as usize, self.height as usize);
        let bar_x = (self.sequence as usize * 4) % w;
        let bar_w = (w / 10).max(1);

        let mut y = vec![40u8; w * h];
        for row in y.chunks_mut(w) {
            for px in row.iter_mut().skip(bar_x).take(bar_w) {
                *px = 220;
            }
        }
        let chroma_len = w.div_ceil(2) * h.div_ceil(2);
        let u = vec![128u8; chroma_len];
        let v = vec![128u8; chroma_len];

        let planes = YuvPlanes {
            y: &y,
            u: &u,
            v: &v,
            y_row_stride: w,
            uv_row_stride: w.div_ceil(2),
            uv_pixel_stride: 1,
        };
        yuv420_to_rgb(&planes, self.width, self.height, timestamp_ms, self.sequence)
    }
}

impl FrameSource for TestPatternSource {
    async fn next_frame(&mut self) -> Result<VideoFrame, CameraError> {
        let tick = self.ticker.tick().await;
        let timestamp_ms = tick.saturating_duration_since(self.started).as_millis() as u64;
        let frame = self.render(timestamp_ms)?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_pattern_frames_advance() {
        let config = CameraConfig {
            width: 32,
            height: 16,
            fps: 10,
            ..Default::default()
        };
        let mut source = TestPatternSource::new(&config);

        let first = source.next_frame().await.unwrap();
        let second = source.next_frame().await.unwrap();

        assert_eq!(first.width, 32);
        assert_eq!(first.data.len(), 32 * 16 * 3);
        assert_eq!(second.sequence, first.sequence + 1);
        assert_ne!(first.data, second.data);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timestamps_are_monotonic_from_start() {
        let config = CameraConfig {
            width: 8,
            height: 8,
            fps: 10,
            ..Default::default()
        };
        let mut source = TestPatternSource::new(&config);

        let mut stamps = Vec::new();
        for _ in 0..4 {
            stamps.push(source.next_frame().await.unwrap().timestamp_ms);
        }
        assert_eq!(stamps, vec![0, 100, 200, 300]);
    }
}
