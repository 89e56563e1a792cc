//! Detector-space to view-space geometry

use camera_capture::CameraFacing;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (left/top inclusive, right/bottom exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Integer pixel rectangle, truncating toward zero
    pub fn to_pixels(&self) -> [i32; 4] {
        [
            self.left as i32,
            self.top as i32,
            self.right as i32,
            self.bottom as i32,
        ]
    }

    /// Grow by `margin` of the box size on each side, clamped to `bounds`
    pub fn expand_within(&self, margin: f32, bounds: Size) -> BoundingBox {
        let dx = (self.width() * margin).trunc();
        let dy = (self.height() * margin).trunc();
        BoundingBox {
            left: (self.left - dx).max(0.0),
            top: (self.top - dy).max(0.0),
            right: (self.right + dx).min(bounds.width),
            bottom: (self.bottom + dy).min(bounds.height),
        }
    }
}

/// Width/height pair in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Map a detector-space box onto a view showing the image fit-center.
///
/// The image is scaled uniformly to fit the view and letterboxed in the
/// middle. Front camera previews are mirrored, so the box is reflected
/// horizontally. Degenerate sizes collapse to an empty box at the origin.
pub fn transform_bounding_box(
    bbox: &BoundingBox,
    image: Size,
    view: Size,
    facing: CameraFacing,
) -> BoundingBox {
    if image.is_degenerate() || view.is_degenerate() {
        return BoundingBox::default();
    }

    let scale = (view.width / image.width).min(view.height / image.height);
    let offset_x = (view.width - image.width * scale) / 2.0;
    let offset_y = (view.height - image.height * scale) / 2.0;

    let top = offset_y + bbox.top * scale;
    let bottom = offset_y + bbox.bottom * scale;

    if facing.is_mirrored() {
        BoundingBox {
            left: view.width - (offset_x + bbox.right * scale),
            top,
            right: view.width - (offset_x + bbox.left * scale),
            bottom,
        }
    } else {
        BoundingBox {
            left: offset_x + bbox.left * scale,
            top,
            right: offset_x + bbox.right * scale,
            bottom,
        }
    }
}
