//! USB webcam capture

use crate::config::VisionConfig;
use crate::error::VisionError;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use sortline_core::{FrameAcquisitionError, FrameSource};
use tracing::{info, warn};

/// Camera manager for USB webcam capture
pub struct CameraManager {
    config: VisionConfig,
    capture: Option<VideoCapture>,
}

impl CameraManager {
    /// Open the camera named in the config
    pub fn open(config: &VisionConfig) -> Result<Self, VisionError> {
        let mut capture = VideoCapture::new(config.camera_id as i32, CAP_ANY)
            .map_err(|e| VisionError::Camera(format!("Failed to open camera {}: {}", config.camera_id, e)))?;

        if !capture
            .is_opened()
            .map_err(|e| VisionError::Camera(format!("Camera {} not opened: {}", config.camera_id, e)))?
        {
            return Err(VisionError::Camera(format!("Camera {} failed to open", config.camera_id)));
        }

        let (width, height) = config.resolution;
        if width == 0 || height == 0 || config.frame_rate == 0 {
            return Err(VisionError::Camera("Invalid camera resolution or frame rate".to_string()));
        }

        // Drivers may ignore these; the frames we get are what we use.
        for (prop, value, name) in [
            (CAP_PROP_FRAME_WIDTH, width as f64, "width"),
            (CAP_PROP_FRAME_HEIGHT, height as f64, "height"),
            (CAP_PROP_FPS, config.frame_rate as f64, "FPS"),
        ] {
            match capture.set(prop, value) {
                Ok(true) => {}
                Ok(false) => warn!("Camera {} ignored {} = {}", config.camera_id, name, value),
                Err(e) => return Err(VisionError::Camera(format!("Failed to set {}: {}", name, e))),
            }
        }

        info!(
            "Camera {} initialized at {}x{} @ {}fps",
            config.camera_id, width, height, config.frame_rate
        );

        Ok(Self {
            config: config.clone(),
            capture: Some(capture),
        })
    }

    pub fn is_open(&self) -> bool {
        self.capture.is_some()
    }

    pub fn camera_id(&self) -> u32 {
        self.config.camera_id
    }

    fn read_frame(&mut self) -> Result<Mat, VisionError> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| VisionError::Camera("Camera already released".to_string()))?;

        let mut frame = Mat::default();
        if !capture.read(&mut frame)? {
            return Err(VisionError::Camera(format!("Camera {} returned no frame", self.config.camera_id)));
        }
        if frame.empty() {
            return Err(VisionError::Camera(format!("Camera {} returned an empty frame", self.config.camera_id)));
        }
        Ok(frame)
    }
}

impl FrameSource for CameraManager {
    type Frame = Mat;

    fn acquire(&mut self) -> Result<Mat, FrameAcquisitionError> {
        self.read_frame().map_err(FrameAcquisitionError::from)
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                warn!("Failed to release camera {}: {}", self.config.camera_id, e);
            }
            info!("Camera {} released", self.config.camera_id);
        }
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.release();
    }
}
