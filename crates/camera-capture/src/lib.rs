//! Camera Capture Library for the baby monitor
//!
//! Provides the frame plumbing shared by the analysis pipeline and the
//! streaming server:
//! - RGB video frames and JPEG encoding
//! - YUV420 planar to RGB conversion
//! - Latest-frame buffer feeding MJPEG clients
//! - A synthetic test-pattern source for running without camera hardware

pub mod buffer;
pub mod frame;
pub mod source;
pub mod yuv;

pub use buffer::FrameBuffer;
pub use frame::VideoFrame;
pub use source::{FrameSource, TestPatternSource};
pub use yuv::{yuv420_to_rgb, YuvPlanes};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Plane too short: {plane} needs {needed} bytes, got {actual}")]
    PlaneTooShort {
        plane: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("JPEG encoding failed: {0}")]
    Encode(String),

    #[error("Streaming error: {0}")]
    Stream(String),
}

/// Which lens the frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// Rear camera (default)
    #[default]
    Back,
    /// Selfie camera; preview is mirrored horizontally
    Front,
}

impl CameraFacing {
    /// The other lens
    pub fn toggled(self) -> Self {
        match self {
            CameraFacing::Back => CameraFacing::Front,
            CameraFacing::Front => CameraFacing::Back,
        }
    }

    /// Whether overlay geometry must be mirrored for this lens
    pub fn is_mirrored(self) -> bool {
        matches!(self, CameraFacing::Front)
    }
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Active lens
    pub facing: CameraFacing,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
    /// JPEG quality for streamed frames
    pub stream_quality: u8,
    /// JPEG quality for gallery captures
    pub capture_quality: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            facing: CameraFacing::Back,
            width: 640,
            height: 480,
            fps: 15,
            stream_quality: 80,
            capture_quality: 90,
        }
    }
}
