//! Per-frame observations, monitor events and analysis results

use crate::geometry::BoundingBox;
use crate::overlay::FaceOverlay;
use serde::{Deserialize, Serialize};

/// Facial expression as reported by the classifier (AffectNet 7 classes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Expression {
    Anger,
    Disgust,
    Fear,
    Happiness,
    Neutral,
    Sadness,
    Surprise,
    /// Classifier gave no usable answer, or no face was visible
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

/// Classifier output order
pub const AFFECTNET_CLASSES: [Expression; 7] = [
    Expression::Anger,
    Expression::Disgust,
    Expression::Fear,
    Expression::Happiness,
    Expression::Neutral,
    Expression::Sadness,
    Expression::Surprise,
];

impl Expression {
    /// Classifier label ("Happiness", ..., "unknown")
    pub fn as_label(&self) -> &'static str {
        match self {
            Expression::Anger => "Anger",
            Expression::Disgust => "Disgust",
            Expression::Fear => "Fear",
            Expression::Happiness => "Happiness",
            Expression::Neutral => "Neutral",
            Expression::Sadness => "Sadness",
            Expression::Surprise => "Surprise",
            Expression::Unknown => "unknown",
        }
    }

    /// Parse a classifier label. Anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "anger" => Expression::Anger,
            "disgust" => Expression::Disgust,
            "fear" => Expression::Fear,
            "happiness" | "happy" => Expression::Happiness,
            "neutral" => Expression::Neutral,
            "sadness" | "sad" => Expression::Sadness,
            "surprise" => Expression::Surprise,
            _ => Expression::Unknown,
        }
    }

    /// Display name shown to parents
    pub fn korean(&self) -> &'static str {
        match self {
            Expression::Anger => "분노",
            Expression::Disgust => "혐오",
            Expression::Fear => "두려움",
            Expression::Happiness => "행복",
            Expression::Neutral => "중립",
            Expression::Sadness => "슬픔",
            Expression::Surprise => "놀람",
            Expression::Unknown => "알 수 없음",
        }
    }

    /// Event raised once per stable run of this expression, if any
    pub fn alert_event(&self) -> Option<MonitorEvent> {
        match self {
            Expression::Happiness => Some(MonitorEvent::Happy),
            Expression::Sadness => Some(MonitorEvent::Sad),
            _ => None,
        }
    }

    /// Whether a stable run of this expression may trigger an auto-capture
    pub fn is_capturable(&self) -> bool {
        !matches!(self, Expression::Unknown)
    }
}

/// Human-facing events pushed to the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// Eyes stayed closed long enough to call it sleep
    Sleep,
    /// Eyes stayed open long enough after sleep
    Wake,
    /// Face disappeared while asleep
    FaceUndetected,
    /// Stable happy expression
    Happy,
    /// Stable sad expression
    Sad,
}

impl MonitorEvent {
    /// Message text served by the status endpoint
    pub fn message(&self) -> &'static str {
        match self {
            MonitorEvent::Sleep => "수면",
            MonitorEvent::Wake => "기상",
            MonitorEvent::FaceUndetected => "얼굴 미감지",
            MonitorEvent::Happy => "행복",
            MonitorEvent::Sad => "슬픔",
        }
    }

    /// Parse a status message back into an event
    pub fn from_message(message: &str) -> Option<Self> {
        match message.trim() {
            "수면" => Some(MonitorEvent::Sleep),
            "기상" => Some(MonitorEvent::Wake),
            "얼굴 미감지" => Some(MonitorEvent::FaceUndetected),
            "행복" => Some(MonitorEvent::Happy),
            "슬픔" => Some(MonitorEvent::Sad),
            _ => None,
        }
    }

    /// Short ASCII name for logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorEvent::Sleep => "sleep",
            MonitorEvent::Wake => "wake",
            MonitorEvent::FaceUndetected => "face_undetected",
            MonitorEvent::Happy => "happy",
            MonitorEvent::Sad => "sad",
        }
    }
}

/// Sleep state of the monitored baby
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepState {
    #[default]
    Awake,
    Asleep,
}

/// What the detector and classifier saw in one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameObservation {
    /// Processing time (milliseconds, monotonic within a session)
    pub timestamp_ms: u64,
    pub face_detected: bool,
    pub left_eye_open: Option<f32>,
    pub right_eye_open: Option<f32>,
    pub smiling: Option<f32>,
    pub expression: Expression,
    /// Face box in detector pixel space
    pub bounding_box: BoundingBox,
}

impl FrameObservation {
    /// Observation for a frame without any face
    pub fn no_face(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            ..Default::default()
        }
    }

    /// Both eye probabilities, if the detector reported them
    pub fn eye_probabilities(&self) -> Option<(f32, f32)> {
        self.left_eye_open.zip(self.right_eye_open)
    }
}

/// Auto-capture decided for this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDecision {
    pub expression: Expression,
}

/// Complete per-frame tracker output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub timestamp_ms: u64,

    /// Whether a face was detected
    pub face_detected: bool,

    /// Sleep state after this frame
    pub sleep_state: SleepState,

    /// Events emitted by this frame, in emission order
    pub events: Vec<MonitorEvent>,

    /// Expression, once it has been stable for the configured window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_expression: Option<Expression>,

    /// Auto-capture to perform for this frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture: Option<CaptureDecision>,

    /// Overlay geometry in view space (filled by the pipeline)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<FaceOverlay>,
}
