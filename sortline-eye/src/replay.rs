//! Replay of still images as a frame source
//!
//! Feeds a directory of images through the control loop in file-name order.
//! Useful for bench tests of the sorter without a camera attached.

use crate::error::VisionError;
use image::RgbImage;
use sortline_core::{FrameAcquisitionError, FrameSource};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Frame source backed by a sorted list of image files
pub struct ImageSequenceSource {
    frames: Vec<PathBuf>,
    next: usize,
    released: bool,
}

impl ImageSequenceSource {
    /// Collect every image file directly inside `dir`, sorted by name
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, VisionError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(VisionError::Config(format!("{} is not a directory", dir.display())));
        }

        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                frames.push(path);
            }
        }
        frames.sort();

        if frames.is_empty() {
            return Err(VisionError::Config(format!("No images found in {}", dir.display())));
        }

        info!("Replaying {} images from {}", frames.len(), dir.display());
        Ok(Self::from_paths(frames))
    }

    /// Replay an explicit list of files in the given order
    pub fn from_paths(frames: Vec<PathBuf>) -> Self {
        Self {
            frames,
            next: 0,
            released: false,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames not yet delivered
    pub fn remaining(&self) -> usize {
        self.frames.len().saturating_sub(self.next)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    type Frame = RgbImage;

    fn acquire(&mut self) -> Result<RgbImage, FrameAcquisitionError> {
        if self.released {
            return Err(FrameAcquisitionError("image sequence released".to_string()));
        }

        let path = self
            .frames
            .get(self.next)
            .ok_or_else(|| FrameAcquisitionError("image sequence exhausted".to_string()))?;
        self.next += 1;

        debug!("Loading frame {}", path.display());
        let frame = image::open(path).map_err(VisionError::from)?.to_rgb8();
        Ok(frame)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            info!("Image sequence released after {} frames", self.next);
        }
    }
}
