//! Overlay description for the preview: face box plus a status line

use crate::analysis::Expression;
use crate::geometry::BoundingBox;
use serde::{Deserialize, Serialize};

/// Which overlay elements are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub show_face_box: bool,
    pub show_expression: bool,
    pub show_eye_probability: bool,
    pub show_smile_probability: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_face_box: true,
            show_expression: true,
            show_eye_probability: true,
            show_smile_probability: true,
        }
    }
}

/// Overlay for the first detected face, in view coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceOverlay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FaceOverlay {
    pub fn build(
        display: &DisplayConfig,
        view_box: BoundingBox,
        expression: Expression,
        eyes: (Option<f32>, Option<f32>),
        smiling: Option<f32>,
    ) -> Self {
        Self {
            face_box: display.show_face_box.then_some(view_box),
            label: overlay_label(display, expression, eyes, smiling),
        }
    }
}

fn fmt_prob(p: Option<f32>) -> String {
    p.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}", v))
}

/// Status line, e.g. `표정: Happiness  눈: L=0.91 R=0.88  웃음: N/A`
pub fn overlay_label(
    display: &DisplayConfig,
    expression: Expression,
    (left, right): (Option<f32>, Option<f32>),
    smiling: Option<f32>,
) -> Option<String> {
    let mut parts = Vec::with_capacity(3);
    if display.show_expression {
        parts.push(format!("표정: {}", expression.as_label()));
    }
    if display.show_eye_probability {
        parts.push(format!("눈: L={} R={}", fmt_prob(left), fmt_prob(right)));
    }
    if display.show_smile_probability {
        parts.push(format!("웃음: {}", fmt_prob(smiling)));
    }

    (!parts.is_empty()).then(|| parts.join("  "))
}
