// SPDX-License-Identifier: GPL-3.0-only

//! Camera frame to luma conversion
//!
//! The decoders work on 8-bit grayscale. Analysis frames already arrive as
//! GRAY8 and only need their stride padding removed; the other formats are
//! reduced with BT.601 weights.

use crate::backends::camera::types::{CameraFrame, PixelFormat};
use image::GrayImage;
use tracing::warn;

/// Build a tightly packed luma image from a frame
///
/// Returns `None` when the frame is empty or its data is shorter than its
/// declared geometry.
pub fn frame_to_luma(frame: &CameraFrame) -> Option<GrayImage> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    if width == 0 || height == 0 {
        return None;
    }

    let bpp = frame.format.bytes_per_pixel() as usize;
    let stride = (frame.stride as usize).max(width * bpp);
    let data = frame.data_slice();

    // Last row needs no padding
    let required = stride * (height - 1) + width * bpp;
    if data.len() < required {
        warn!(
            len = data.len(),
            required,
            width,
            height,
            format = ?frame.format,
            "Frame data shorter than its geometry"
        );
        return None;
    }

    let mut luma = Vec::with_capacity(width * height);
    for row in data.chunks(stride).take(height) {
        let row = &row[..width * bpp];
        match frame.format {
            // NV12's first plane is the Y plane
            PixelFormat::Gray8 | PixelFormat::NV12 => luma.extend_from_slice(row),
            PixelFormat::RGB24 | PixelFormat::RGBA => {
                luma.extend(row.chunks_exact(bpp).map(|px| rgb_to_luma(px[0], px[1], px[2])))
            }
        }
    }

    GrayImage::from_raw(frame.width, frame.height, luma)
}

/// BT.601 luma in fixed point
#[inline]
fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32 + 128) >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::FrameData;
    use std::time::Instant;

    #[test]
    fn test_gray_stride_removed() {
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: FrameData::from(vec![10, 20, 0, 0, 30, 40]),
            format: PixelFormat::Gray8,
            stride: 4,
            captured_at: Instant::now(),
        };

        let luma = frame_to_luma(&frame).unwrap();
        assert_eq!(luma.as_raw(), &vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_rgba_to_luma() {
        let frame = CameraFrame::from_packed(
            2,
            1,
            PixelFormat::RGBA,
            vec![255, 255, 255, 255, 0, 0, 0, 255],
        );

        let luma = frame_to_luma(&frame).unwrap();
        assert_eq!(luma.as_raw(), &vec![255, 0]);
    }

    #[test]
    fn test_short_frame_rejected() {
        let frame = CameraFrame::from_packed(4, 4, PixelFormat::Gray8, vec![0; 8]);
        assert!(frame_to_luma(&frame).is_none());
    }
}
