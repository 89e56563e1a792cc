//! Baby Monitoring System (BMS)
//!
//! Per-frame analysis of a baby camera feed:
//! - Eye-state tracking with debounced sleep/wake detection
//! - Expression stability tracking (happy/sad alerts)
//! - Daily auto-capture of stable expressions
//! - Face box mapping from detector space to the preview
//! - Latest-event publication for remote viewers

pub mod analysis;
pub mod capture;
pub mod config;
pub mod detector;
pub mod expression;
pub mod eyes;
pub mod geometry;
pub mod overlay;
pub mod pipeline;
pub mod publisher;
pub mod tracker;

pub use analysis::{
    CaptureDecision, Expression, FrameAnalysis, FrameObservation, MonitorEvent, SleepState,
    AFFECTNET_CLASSES,
};
pub use capture::DailyCaptureGate;
pub use config::BmsConfig;
pub use detector::{
    classifier_from_config, ExpressionClassifier, FaceDetection, FaceDetector, MockFaceDetector,
    OnnxExpressionClassifier, StaticClassifier,
};
pub use expression::{ExpressionStabilizer, ExpressionUpdate};
pub use eyes::{EyeReading, EyeStateTracker};
pub use geometry::{transform_bounding_box, BoundingBox, Size};
pub use overlay::{DisplayConfig, FaceOverlay};
pub use pipeline::{
    detect_and_classify, AnalysisError, AnalysisTicket, AnalyzerHandle, CaptureRequest,
    CaptureSink, FrameAnalyzer,
};
pub use publisher::{EventPublisher, StatusSnapshot};
pub use tracker::FrameTracker;

use camera_capture::CameraError;
use thiserror::Error;

/// BMS error types
#[derive(Error, Debug)]
pub enum BmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
}
