//! YUV420 planar to RGB conversion
//!
//! Camera stacks hand out three planes with independent row strides and a
//! chroma pixel stride (1 for I420, 2 for the interleaved NV12/NV21 layouts).

use crate::{CameraError, VideoFrame};

/// Borrowed YUV420 planes of one image
#[derive(Debug, Clone, Copy)]
pub struct YuvPlanes<'a> {
    pub y: &'a [u8],
    pub u: &'a [u8],
    pub v: &'a [u8],
    pub y_row_stride: usize,
    pub uv_row_stride: usize,
    pub uv_pixel_stride: usize,
}

impl<'a> YuvPlanes<'a> {
    fn check(&self, width: usize, height: usize) -> Result<(), CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::Format(format!("empty image {}x{}", width, height)));
        }
        if self.y_row_stride < width || self.uv_pixel_stride == 0 {
            return Err(CameraError::Format("stride smaller than image".into()));
        }

        let y_needed = (height - 1) * self.y_row_stride + width;
        let uv_needed =
            ((height - 1) / 2) * self.uv_row_stride + ((width - 1) / 2) * self.uv_pixel_stride + 1;

        for (plane, len, needed) in [
            ("y", self.y.len(), y_needed),
            ("u", self.u.len(), uv_needed),
            ("v", self.v.len(), uv_needed),
        ] {
            if len < needed {
                return Err(CameraError::PlaneTooShort {
                    plane,
                    needed,
                    actual: len,
                });
            }
        }
        Ok(())
    }
}

/// Convert YUV420 planes into an RGB frame (BT.601, full range)
pub fn yuv420_to_rgb(
    planes: &YuvPlanes<'_>,
    width: u32,
    height: u32,
    timestamp_ms: u64,
    sequence: u32,
) -> Result<VideoFrame, CameraError> {
    let (w, h) = (width as usize, height as usize);
    planes.check(w, h)?;

    let mut rgb = Vec::with_capacity(w * h * 3);
    for j in 0..h {
        for i in 0..w {
            let y = planes.y[j * planes.y_row_stride + i] as f32;
            let uv_index = (j / 2) * planes.uv_row_stride + (i / 2) * planes.uv_pixel_stride;
            let u = planes.u[uv_index] as f32 - 128.0;
            let v = planes.v[uv_index] as f32 - 128.0;

            let r = y + 1.370705 * v;
            let g = y - 0.337633 * u - 0.698001 * v;
            let b = y + 1.732446 * u;

            rgb.push(clamp_channel(r));
            rgb.push(clamp_channel(g));
            rgb.push(clamp_channel(b));
        }
    }

    Ok(VideoFrame::new(rgb, width, height, timestamp_ms, sequence))
}

fn clamp_channel(value: f32) -> u8 {
    // truncate toward zero first, like an integer cast, then clamp
    (value as i32).clamp(0, 255) as u8
}
