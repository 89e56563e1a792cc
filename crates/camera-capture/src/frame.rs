//! Video frame types and processing

use crate::CameraError;
use bytes::Bytes;
use image::{codecs::jpeg::JpegEncoder, ImageBuffer, Rgb, RgbImage};

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (milliseconds since the Unix epoch)
    pub timestamp_ms: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ms: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ms,
            sequence,
        }
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        let px = self.data.get(idx..idx + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Crop a region of the frame
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Option<VideoFrame> {
        if w == 0 || h == 0 || x + w > self.width || y + h > self.height {
            return None;
        }

        let mut cropped = Vec::with_capacity((w * h * 3) as usize);
        for row in y..(y + h) {
            let start = ((row * self.width + x) * 3) as usize;
            let end = start + (w * 3) as usize;
            cropped.extend_from_slice(self.data.get(start..end)?);
        }

        Some(VideoFrame {
            data: cropped,
            width: w,
            height: h,
            timestamp_ms: self.timestamp_ms,
            sequence: self.sequence,
        })
    }

    /// Borrow the frame as an `image` buffer
    pub fn to_image(&self) -> Result<RgbImage, CameraError> {
        ImageBuffer::<Rgb<u8>, _>::from_raw(self.width, self.height, self.data.clone()).ok_or_else(
            || {
                CameraError::Format(format!(
                    "{} bytes do not fill a {}x{} RGB frame",
                    self.data.len(),
                    self.width,
                    self.height
                ))
            },
        )
    }

    /// Encode the frame as JPEG
    pub fn to_jpeg(&self, quality: u8) -> Result<Bytes, CameraError> {
        let img = self.to_image()?;
        let mut jpeg = Vec::with_capacity(self.data.len() / 8);
        JpegEncoder::new_with_quality(&mut jpeg, quality)
            .encode_image(&img)
            .map_err(|e| CameraError::Encode(e.to_string()))?;
        Ok(Bytes::from(jpeg))
    }
}
