//! Face detection and expression classification models

use crate::analysis::{Expression, AFFECTNET_CLASSES};
use crate::geometry::{BoundingBox, Size};
use crate::{BmsConfig, BmsError};
use camera_capture::frame::VideoFrame;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use tract_onnx::prelude::*;

/// Classifier input edge length
pub const EXPRESSION_INPUT_SIZE: u32 = 224;

/// Margin added around the face box before cropping, as a fraction of its size
pub const FACE_CROP_MARGIN: f32 = 0.2;

/// Per-channel means subtracted from the input, in B, G, R order
const BGR_MEANS: [f32; 3] = [103.939, 116.779, 123.68];

/// One detected face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    /// Face box in frame pixel space
    pub bbox: BoundingBox,
    /// Left eye open probability (0-1), if reported
    pub left_eye_open: Option<f32>,
    /// Right eye open probability (0-1), if reported
    pub right_eye_open: Option<f32>,
    /// Smiling probability (0-1), if reported
    pub smiling: Option<f32>,
    pub confidence: f32,
}

/// Face detector backend
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a frame, most prominent first
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceDetection>, BmsError>;
}

/// Expression classifier backend
pub trait ExpressionClassifier: Send + Sync {
    /// Classify the expression of the face at `bbox`
    fn classify(&self, frame: &VideoFrame, bbox: &BoundingBox) -> Result<Expression, BmsError>;
}

/// Detector reporting a fixed face in the middle of every frame
#[derive(Debug, Clone)]
pub struct MockFaceDetector {
    face_present: bool,
    eyes: Option<(f32, f32)>,
    smiling: Option<f32>,
}

impl Default for MockFaceDetector {
    fn default() -> Self {
        Self {
            face_present: true,
            eyes: Some((0.8, 0.8)),
            smiling: Some(0.2),
        }
    }
}

impl MockFaceDetector {
    pub fn new() -> Self {
        warn!("No face detector configured. Using mock implementation.");
        Self::default()
    }

    /// Mock that never sees a face
    pub fn empty() -> Self {
        Self {
            face_present: false,
            ..Default::default()
        }
    }

    /// Mock reporting the given eye-open probabilities
    pub fn with_eyes(left: f32, right: f32) -> Self {
        Self {
            eyes: Some((left, right)),
            ..Default::default()
        }
    }
}

impl FaceDetector for MockFaceDetector {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceDetection>, BmsError> {
        if !self.face_present {
            return Ok(vec![]);
        }

        let w = frame.width as f32;
        let h = frame.height as f32;
        Ok(vec![FaceDetection {
            bbox: BoundingBox::new(w * 0.3, h * 0.2, w * 0.7, h * 0.7),
            left_eye_open: self.eyes.map(|(l, _)| l),
            right_eye_open: self.eyes.map(|(_, r)| r),
            smiling: self.smiling,
            confidence: 0.95,
        }])
    }
}

/// Classifier that always answers the same label
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticClassifier(pub Expression);

impl ExpressionClassifier for StaticClassifier {
    fn classify(&self, _frame: &VideoFrame, _bbox: &BoundingBox) -> Result<Expression, BmsError> {
        Ok(self.0)
    }
}

/// Build a classifier from config: ONNX when a model path is set, else a
/// static "unknown" classifier
pub fn classifier_from_config(
    config: &BmsConfig,
) -> Result<Box<dyn ExpressionClassifier>, BmsError> {
    match &config.expression_model_path {
        Some(path) => Ok(Box::new(OnnxExpressionClassifier::load(path)?)),
        None => {
            warn!("No expression model path configured. Using mock implementation.");
            Ok(Box::new(StaticClassifier(Expression::Unknown)))
        }
    }
}

/// AffectNet expression classifier running an ONNX model with tract.
///
/// The model takes a `1x224x224x3` BGR tensor with channel means removed and
/// outputs seven class scores.
pub struct OnnxExpressionClassifier {
    model: TypedRunnableModel<TypedModel>,
}

impl OnnxExpressionClassifier {
    pub fn load(path: &str) -> Result<Self, BmsError> {
        info!("Loading expression model from {}", path);
        let size = EXPRESSION_INPUT_SIZE as usize;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, size, size, 3]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| {
                error!("Failed to load expression model: {}", e);
                BmsError::ModelLoad(e.to_string())
            })?;

        Ok(Self { model })
    }
}

impl ExpressionClassifier for OnnxExpressionClassifier {
    fn classify(&self, frame: &VideoFrame, bbox: &BoundingBox) -> Result<Expression, BmsError> {
        let input = preprocess_face(frame, bbox)?;
        let size = EXPRESSION_INPUT_SIZE as usize;
        let tensor: Tensor = tract_ndarray::Array4::from_shape_vec((1, size, size, 3), input)
            .map_err(|e| BmsError::ImageProcessing(e.to_string()))?
            .into();

        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .map_err(|e| BmsError::Inference(e.to_string()))?;
        let scores = outputs
            .first()
            .ok_or_else(|| BmsError::Inference("model produced no output".into()))?
            .to_array_view::<f32>()
            .map_err(|e| BmsError::Inference(e.to_string()))?
            .iter()
            .copied()
            .collect::<Vec<_>>();

        debug!("Expression scores: {:?}", scores);
        Ok(label_for_scores(&scores))
    }
}

/// Crop the face with margin, resize it to the classifier input and
/// produce mean-subtracted BGR values in row-major HWC order
pub fn preprocess_face(frame: &VideoFrame, bbox: &BoundingBox) -> Result<Vec<f32>, BmsError> {
    let bounds = Size::new(frame.width as f32, frame.height as f32);
    let [left, top, right, bottom] = bbox.expand_within(FACE_CROP_MARGIN, bounds).to_pixels();
    if right <= left || bottom <= top || left < 0 || top < 0 {
        return Err(BmsError::ImageProcessing(format!(
            "face box {:?} outside {}x{} frame",
            bbox, frame.width, frame.height
        )));
    }

    let face = frame
        .crop(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
        .ok_or_else(|| BmsError::ImageProcessing("face crop out of bounds".into()))?
        .to_image()?;

    let resized = imageops::resize(
        &face,
        EXPRESSION_INPUT_SIZE,
        EXPRESSION_INPUT_SIZE,
        FilterType::Nearest,
    );

    let mut input = Vec::with_capacity((EXPRESSION_INPUT_SIZE * EXPRESSION_INPUT_SIZE * 3) as usize);
    for pixel in resized.pixels() {
        let [r, g, b] = pixel.0;
        input.push(b as f32 - BGR_MEANS[0]);
        input.push(g as f32 - BGR_MEANS[1]);
        input.push(r as f32 - BGR_MEANS[2]);
    }
    Ok(input)
}

/// Highest-scoring class, or `Unknown` when the output is unusable
pub fn label_for_scores(scores: &[f32]) -> Expression {
    if scores.len() != AFFECTNET_CLASSES.len() {
        return Expression::Unknown;
    }
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map_or(Expression::Unknown, |(i, _)| AFFECTNET_CLASSES[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> VideoFrame {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        VideoFrame::new(data, width, height, 0, 0)
    }

    #[test]
    fn test_mock_detector_centres_face() {
        let frame = solid_frame(100, 100, [0, 0, 0]);
        let faces = MockFaceDetector::default().detect(&frame).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].bbox, BoundingBox::new(30.0, 20.0, 70.0, 70.0));
        assert_eq!(faces[0].left_eye_open, Some(0.8));

        assert!(MockFaceDetector::empty().detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_label_for_scores() {
        let scores = [0.1, 0.0, 0.0, 0.7, 0.1, 0.05, 0.05];
        assert_eq!(label_for_scores(&scores), Expression::Happiness);
        assert_eq!(label_for_scores(&[0.5, 0.5]), Expression::Unknown);
        assert_eq!(label_for_scores(&[f32::NAN; 7]), Expression::Unknown);
    }

    #[test]
    fn test_preprocess_bgr_means() {
        let frame = solid_frame(64, 48, [200, 100, 50]);
        let bbox = BoundingBox::new(10.0, 10.0, 30.0, 30.0);
        let input = preprocess_face(&frame, &bbox).unwrap();

        let size = EXPRESSION_INPUT_SIZE as usize;
        assert_eq!(input.len(), size * size * 3);
        assert!((input[0] - (50.0 - 103.939)).abs() < 1e-3);
        assert!((input[1] - (100.0 - 116.779)).abs() < 1e-3);
        assert!((input[2] - (200.0 - 123.68)).abs() < 1e-3);
    }

    #[test]
    fn test_preprocess_clamps_margin_at_edges() {
        let frame = solid_frame(40, 40, [10, 10, 10]);
        let bbox = BoundingBox::new(0.0, 0.0, 40.0, 40.0);
        assert!(preprocess_face(&frame, &bbox).is_ok());
    }

    #[test]
    fn test_preprocess_rejects_empty_box() {
        let frame = solid_frame(40, 40, [10, 10, 10]);
        let bbox = BoundingBox::new(50.0, 50.0, 60.0, 60.0);
        assert!(matches!(
            preprocess_face(&frame, &bbox),
            Err(BmsError::ImageProcessing(_))
        ));
    }

    #[test]
    fn test_missing_model_is_load_error() {
        let result = OnnxExpressionClassifier::load("/nonexistent/expression.onnx");
        assert!(matches!(result, Err(BmsError::ModelLoad(_))));
    }

    #[test]
    fn test_static_classifier_from_config() {
        let classifier = classifier_from_config(&BmsConfig::default()).unwrap();
        let frame = solid_frame(8, 8, [0, 0, 0]);
        let expr = classifier
            .classify(&frame, &BoundingBox::new(0.0, 0.0, 8.0, 8.0))
            .unwrap();
        assert_eq!(expr, Expression::Unknown);
    }
}
