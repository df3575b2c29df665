//! Frame to model-input conversion
//!
//! The classifier takes a single NHWC `f32` batch: `[1, height, width, 3]`
//! with every channel scaled to [0, 1].

use crate::config::ChannelOrder;
use crate::error::VisionError;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Largest tensor we are willing to build, in elements
const MAX_TENSOR_ELEMENTS: u64 = 100_000_000;

/// A frame that can be turned into classifier input
pub trait TensorInput {
    /// Frame size as (width, height)
    fn dimensions(&self) -> (u32, u32);

    /// Resize to `size` and flatten into a normalized NHWC buffer
    fn to_input_tensor(&self, size: (u32, u32), order: ChannelOrder) -> Result<Vec<f32>, VisionError>;
}

/// Number of elements in a `[1, h, w, 3]` tensor, with overflow checks
pub fn tensor_len(size: (u32, u32)) -> Result<usize, VisionError> {
    let (width, height) = size;
    if width == 0 || height == 0 {
        return Err(VisionError::Processing("Target dimensions cannot be zero".to_string()));
    }

    let total = (width as u64)
        .checked_mul(height as u64)
        .and_then(|p| p.checked_mul(3))
        .ok_or_else(|| VisionError::Processing("Target dimensions would overflow".to_string()))?;

    if total > MAX_TENSOR_ELEMENTS {
        return Err(VisionError::Processing(
            "Target dimensions too large (max 100M elements)".to_string(),
        ));
    }

    Ok(total as usize)
}

/// Scale interleaved 8-bit pixels to [0, 1], swapping R and B when the
/// source order differs from the one the model expects.
pub fn pack_interleaved(pixels: &[u8], source: ChannelOrder, target: ChannelOrder) -> Vec<f32> {
    let swap = source != target;
    let mut out = Vec::with_capacity(pixels.len());
    for px in pixels.chunks_exact(3) {
        let (a, b, c) = if swap { (px[2], px[1], px[0]) } else { (px[0], px[1], px[2]) };
        out.push(a as f32 / 255.0);
        out.push(b as f32 / 255.0);
        out.push(c as f32 / 255.0);
    }
    out
}

impl TensorInput for RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbImage::dimensions(self)
    }

    fn to_input_tensor(&self, size: (u32, u32), order: ChannelOrder) -> Result<Vec<f32>, VisionError> {
        let expected = tensor_len(size)?;
        let (width, height) = RgbImage::dimensions(self);
        if width == 0 || height == 0 {
            return Err(VisionError::Processing("Invalid image dimensions".to_string()));
        }

        let resized = if (width, height) == size {
            self.clone()
        } else {
            imageops::resize(self, size.0, size.1, FilterType::Triangle)
        };

        let tensor = pack_interleaved(resized.as_raw(), ChannelOrder::Rgb, order);
        if tensor.len() != expected {
            return Err(VisionError::Processing(format!(
                "Tensor has {} elements, expected {}",
                tensor.len(),
                expected
            )));
        }
        Ok(tensor)
    }
}

#[cfg(feature = "camera")]
mod mat {
    use super::*;
    use opencv::core::{Mat, Size};
    use opencv::imgproc;
    use opencv::prelude::*;

    impl TensorInput for Mat {
        fn dimensions(&self) -> (u32, u32) {
            (self.cols().max(0) as u32, self.rows().max(0) as u32)
        }

        fn to_input_tensor(&self, size: (u32, u32), order: ChannelOrder) -> Result<Vec<f32>, VisionError> {
            let expected = tensor_len(size)?;
            if self.cols() <= 0 || self.rows() <= 0 {
                return Err(VisionError::Processing("Invalid image dimensions".to_string()));
            }
            if self.channels() != 3 {
                return Err(VisionError::Processing(format!(
                    "Expected 3 channels, got {}",
                    self.channels()
                )));
            }

            let mut resized = Mat::default();
            imgproc::resize(
                self,
                &mut resized,
                Size::new(size.0 as i32, size.1 as i32),
                0.0,
                0.0,
                imgproc::INTER_LINEAR,
            )?;

            // Camera frames are BGR.
            let tensor = pack_interleaved(resized.data_bytes()?, ChannelOrder::Bgr, order);
            if tensor.len() != expected {
                return Err(VisionError::Processing(format!(
                    "Tensor has {} elements, expected {}",
                    tensor.len(),
                    expected
                )));
            }
            Ok(tensor)
        }
    }
}
