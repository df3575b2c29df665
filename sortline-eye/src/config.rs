//! Configuration for sortline-eye

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Channel order the model was trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Vision system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// USB camera device index (0, 1, 2, etc.)
    pub camera_id: u32,
    /// Requested frame rate (frames per second)
    pub frame_rate: u32,
    /// Requested camera resolution (width, height)
    pub resolution: (u32, u32),
    /// Path to the ONNX classifier
    pub model_path: PathBuf,
    /// Model input size (width, height)
    pub input_size: (u32, u32),
    /// Channel order fed to the model. The reference model was trained on
    /// frames straight from the camera, which are BGR.
    pub channel_order: ChannelOrder,
    /// Title of the preview window
    pub window_title: String,
    /// Key code that stops the loop from the preview window (27 = ESC)
    pub exit_key: i32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        let model_path = dirs::home_dir()
            .map(|mut p| {
                p.push(".sortline");
                p.push("models");
                p.push("classifier.onnx");
                p
            })
            .unwrap_or_else(|| PathBuf::from("./models/classifier.onnx"));

        Self {
            camera_id: 0,
            frame_rate: 30,
            resolution: (640, 480),
            model_path,
            input_size: (224, 224),
            channel_order: ChannelOrder::Bgr,
            window_title: "SortLine".to_string(),
            exit_key: 27,
        }
    }
}

impl VisionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_rate == 0 || self.frame_rate > 120 {
            return Err("Frame rate must be between 1 and 120".to_string());
        }

        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err("Resolution must be non-zero".to_string());
        }

        if self.resolution.0 > 7680 || self.resolution.1 > 4320 {
            return Err("Resolution too large (max 8K)".to_string());
        }

        if self.input_size.0 == 0 || self.input_size.1 == 0 {
            return Err("Model input size must be non-zero".to_string());
        }

        if self.input_size.0 > 4096 || self.input_size.1 > 4096 {
            return Err("Model input size too large (max 4096)".to_string());
        }

        if self.camera_id > 100 {
            return Err("Camera ID too large (max 100)".to_string());
        }

        if self.model_path.as_os_str().is_empty() {
            return Err("Model path must not be empty".to_string());
        }

        Ok(())
    }
}
