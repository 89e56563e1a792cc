//! Single-context frame analysis pipeline
//!
//! Frames are handed over through a one-slot mailbox: a newer frame replaces
//! one that has not been picked up yet, so the analyzer always works on the
//! freshest image and never queues. Detection runs on the blocking pool; the
//! tracker update happens on the analyzer task once detection completes, so
//! tracker state is only ever touched from one place.

use crate::analysis::{CaptureDecision, Expression, FrameAnalysis, FrameObservation};
use crate::detector::{ExpressionClassifier, FaceDetection, FaceDetector};
use crate::geometry::{transform_bounding_box, Size};
use crate::overlay::{DisplayConfig, FaceOverlay};
use crate::publisher::EventPublisher;
use crate::tracker::FrameTracker;
use crate::{BmsConfig, BmsError};
use bytes::Bytes;
use camera_capture::{CameraConfig, CameraFacing, FrameBuffer, VideoFrame};
use chrono::Local;
use metrics::counter;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Why a submitted frame produced no analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Frame superseded by a newer frame")]
    Superseded,

    #[error("Analyzer stopped")]
    Stopped,

    #[error("Analysis failed: {0}")]
    Failed(#[from] BmsError),

    #[error("Analysis worker panicked: {0}")]
    Worker(String),
}

/// Photo to store, handed to a [`CaptureSink`]
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub jpeg: Bytes,
    /// Expression label for auto-captures, `camera_request` for manual ones
    pub reason: String,
}

/// Destination for captured photos.
///
/// Must return promptly; storage happens elsewhere and failures are only
/// logged by the implementation.
pub trait CaptureSink: Send + Sync {
    fn capture(&self, request: CaptureRequest);
}

type Reply = oneshot::Sender<Result<FrameAnalysis, AnalysisError>>;

struct PendingFrame {
    frame: VideoFrame,
    reply: Reply,
}

struct Mailbox {
    slot: Mutex<Option<PendingFrame>>,
    switch_to: Mutex<Option<CameraFacing>>,
    notify: Notify,
    stopped: AtomicBool,
}

impl Mailbox {
    fn take_frame(&self) -> Option<PendingFrame> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn take_switch(&self) -> Option<CameraFacing> {
        self.switch_to
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Resolves to the analysis of the submitted frame
pub struct AnalysisTicket {
    rx: oneshot::Receiver<Result<FrameAnalysis, AnalysisError>>,
}

impl Future for AnalysisTicket {
    type Output = Result<FrameAnalysis, AnalysisError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|reply| reply.unwrap_or(Err(AnalysisError::Stopped)))
    }
}

/// Cloneable handle used by the camera side to feed the analyzer
#[derive(Clone)]
pub struct AnalyzerHandle {
    mailbox: Arc<Mailbox>,
}

impl AnalyzerHandle {
    /// Hand a frame to the analyzer without waiting.
    ///
    /// A frame still waiting in the mailbox is replaced and its ticket
    /// resolves to [`AnalysisError::Superseded`].
    pub fn submit(&self, frame: VideoFrame) -> AnalysisTicket {
        let (reply, rx) = oneshot::channel();
        if !self.is_running() {
            let _ = reply.send(Err(AnalysisError::Stopped));
            return AnalysisTicket { rx };
        }

        let previous = self
            .mailbox
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(PendingFrame { frame, reply });
        if let Some(previous) = previous {
            debug!("Dropping frame {} for a newer one", previous.frame.sequence);
            counter!("bms_frames_superseded_total").increment(1);
            let _ = previous.reply.send(Err(AnalysisError::Superseded));
        }

        self.mailbox.notify.notify_one();
        AnalysisTicket { rx }
    }

    /// Switch lens. Eye and expression tracking restart before the next frame
    /// is analyzed and any frame still waiting from the old lens is dropped.
    /// Today's captures stay used up.
    pub fn switch_camera(&self, facing: CameraFacing) {
        *self
            .mailbox
            .switch_to
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(facing);
        if let Some(stale) = self.mailbox.take_frame() {
            let _ = stale.reply.send(Err(AnalysisError::Superseded));
        }
        self.mailbox.notify.notify_one();
    }

    /// Stop the analyzer after the frame in progress
    pub fn shutdown(&self) {
        self.mailbox.stopped.store(true, Ordering::Release);
        self.mailbox.notify.notify_one();
    }

    pub fn is_running(&self) -> bool {
        !self.mailbox.stopped.load(Ordering::Acquire)
    }
}

/// Owns the tracker and drives it from submitted frames
pub struct FrameAnalyzer {
    config: BmsConfig,
    display: DisplayConfig,
    view: Size,
    facing: CameraFacing,
    stream_quality: u8,
    capture_quality: u8,
    detector: Arc<dyn FaceDetector>,
    classifier: Arc<dyn ExpressionClassifier>,
    tracker: FrameTracker,
    publisher: Arc<EventPublisher>,
    frames: Arc<FrameBuffer>,
    sink: Option<Arc<dyn CaptureSink>>,
    mailbox: Arc<Mailbox>,
}

impl FrameAnalyzer {
    /// Create an analyzer and the handle feeding it
    pub fn new(
        config: BmsConfig,
        detector: Arc<dyn FaceDetector>,
        classifier: Arc<dyn ExpressionClassifier>,
        publisher: Arc<EventPublisher>,
        frames: Arc<FrameBuffer>,
    ) -> (Self, AnalyzerHandle) {
        let mailbox = Arc::new(Mailbox {
            slot: Mutex::new(None),
            switch_to: Mutex::new(None),
            notify: Notify::new(),
            stopped: AtomicBool::new(false),
        });
        let camera = CameraConfig::default();

        let analyzer = Self {
            tracker: FrameTracker::new(config.clone(), Local::now().date_naive()),
            config,
            display: DisplayConfig::default(),
            view: Size::new(camera.width as f32, camera.height as f32),
            facing: camera.facing,
            stream_quality: camera.stream_quality,
            capture_quality: camera.capture_quality,
            detector,
            classifier,
            publisher,
            frames,
            sink: None,
            mailbox: mailbox.clone(),
        };
        (analyzer, AnalyzerHandle { mailbox })
    }

    /// Take lens and JPEG qualities from the camera config
    pub fn with_camera(mut self, camera: &CameraConfig) -> Self {
        self.facing = camera.facing;
        self.stream_quality = camera.stream_quality;
        self.capture_quality = camera.capture_quality;
        self
    }

    /// Size of the preview the overlay is drawn on
    pub fn with_view(mut self, view: Size) -> Self {
        self.view = view;
        self
    }

    pub fn with_display(mut self, display: DisplayConfig) -> Self {
        self.display = display;
        self
    }

    pub fn with_capture_sink(mut self, sink: Arc<dyn CaptureSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run the analyzer on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Analyze frames until the handle shuts the analyzer down
    pub async fn run(mut self) {
        info!(
            "Frame analyzer started ({:?} camera, view {}x{})",
            self.facing, self.view.width, self.view.height
        );

        while !self.mailbox.stopped.load(Ordering::Acquire) {
            if let Some(facing) = self.mailbox.take_switch() {
                self.switch_camera(facing);
            }

            match self.mailbox.take_frame() {
                Some(pending) => self.handle(pending).await,
                None => self.mailbox.notify.notified().await,
            }
        }

        if let Some(pending) = self.mailbox.take_frame() {
            let _ = pending.reply.send(Err(AnalysisError::Stopped));
        }
        info!("Frame analyzer stopped");
    }

    fn switch_camera(&mut self, facing: CameraFacing) {
        info!("Switching camera {:?} -> {:?}", self.facing, facing);
        self.facing = facing;
        self.tracker.reset();
        self.publisher.reset_status();
    }

    async fn handle(&mut self, pending: PendingFrame) {
        let PendingFrame { frame, reply } = pending;
        let frame = Arc::new(frame);

        if self.frames.is_streaming() {
            match frame.to_jpeg(self.stream_quality) {
                Ok(jpeg) => {
                    self.frames.publish(jpeg);
                }
                Err(e) => warn!("Stream frame encoding failed: {}", e),
            }
        }

        let result = match self.observe(frame.clone()).await {
            Ok((observation, face)) => Ok(self.apply(&frame, &observation, face.as_ref())),
            Err(e) => {
                warn!("Frame {} analysis failed: {}", frame.sequence, e);
                Err(e)
            }
        };
        let _ = reply.send(result);
    }

    async fn observe(
        &self,
        frame: Arc<VideoFrame>,
    ) -> Result<(FrameObservation, Option<FaceDetection>), AnalysisError> {
        let detector = self.detector.clone();
        let classifier = self.classifier.clone();
        let min_confidence = self.config.face_confidence;

        let observed = tokio::task::spawn_blocking(move || {
            detect_and_classify(detector.as_ref(), classifier.as_ref(), &frame, min_confidence)
        })
        .await
        .map_err(|e| AnalysisError::Worker(e.to_string()))??;
        Ok(observed)
    }

    fn apply(
        &mut self,
        frame: &VideoFrame,
        observation: &FrameObservation,
        face: Option<&FaceDetection>,
    ) -> FrameAnalysis {
        let mut analysis = self
            .tracker
            .process(observation, Local::now().date_naive());

        analysis.overlay = face.map(|face| {
            let image = Size::new(frame.width as f32, frame.height as f32);
            let view_box = transform_bounding_box(&face.bbox, image, self.view, self.facing);
            FaceOverlay::build(
                &self.display,
                view_box,
                observation.expression,
                (face.left_eye_open, face.right_eye_open),
                face.smiling,
            )
        });

        self.publisher.record(&analysis);

        counter!("bms_frames_analyzed_total").increment(1);
        for event in &analysis.events {
            info!("Event: {}", event.message());
            counter!("bms_events_total", "event" => event.as_str()).increment(1);
        }
        if let Some(decision) = analysis.capture {
            self.request_capture(frame, decision);
        }

        analysis
    }

    fn request_capture(&self, frame: &VideoFrame, decision: CaptureDecision) {
        let Some(sink) = &self.sink else {
            debug!("No capture sink, skipping {:?}", decision.expression);
            return;
        };

        match frame.to_jpeg(self.capture_quality) {
            Ok(jpeg) => {
                counter!("bms_auto_captures_total").increment(1);
                sink.capture(CaptureRequest {
                    jpeg,
                    reason: decision.expression.as_label().to_string(),
                });
            }
            Err(e) => error!("Auto-capture encoding failed: {}", e),
        }
    }
}

/// Detect the most prominent confident face and classify its expression
pub fn detect_and_classify(
    detector: &dyn FaceDetector,
    classifier: &dyn ExpressionClassifier,
    frame: &VideoFrame,
    min_confidence: f32,
) -> Result<(FrameObservation, Option<FaceDetection>), BmsError> {
    let face = detector
        .detect(frame)?
        .into_iter()
        .find(|face| face.confidence >= min_confidence);

    let Some(face) = face else {
        return Ok((FrameObservation::no_face(frame.timestamp_ms), None));
    };

    let expression = classifier
        .classify(frame, &face.bbox)
        .unwrap_or_else(|e| {
            warn!("Expression analysis failed: {}", e);
            Expression::Unknown
        });

    let observation = FrameObservation {
        timestamp_ms: frame.timestamp_ms,
        face_detected: true,
        left_eye_open: face.left_eye_open,
        right_eye_open: face.right_eye_open,
        smiling: face.smiling,
        expression,
        bounding_box: face.bbox,
    };
    Ok((observation, Some(face)))
}
