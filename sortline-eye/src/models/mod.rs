//! Classifier models
//!
//! The classifier emits two tensors per frame: class scores, then a
//! normalized bounding box `[xmin, ymin, xmax, ymax]`.

#[cfg(feature = "onnx")]
mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

use crate::error::VisionError;
use sortline_core::{BoundingBox, ClassId, Detection};

/// Turn raw model outputs into a detection: class = argmax, confidence = max score
pub fn decode_outputs(scores: &[f32], bbox: &[f32]) -> Result<Detection, VisionError> {
    if scores.is_empty() {
        return Err(VisionError::Model("Model returned no class scores".to_string()));
    }
    if scores.len() > u8::MAX as usize + 1 {
        return Err(VisionError::Model(format!("Too many classes: {}", scores.len())));
    }
    if bbox.len() < 4 {
        return Err(VisionError::Model(format!(
            "Bounding box needs 4 values, got {}",
            bbox.len()
        )));
    }

    let (index, confidence) = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .fold(None, |best: Option<(usize, f32)>, (i, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
        .ok_or_else(|| VisionError::Model("All class scores are non-finite".to_string()))?;

    let bbox = BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]).clamped();
    Ok(Detection::new(ClassId(index as u8), confidence, bbox))
}
