//! sortline-eye: vision side of the SortLine sorter
//!
//! Frame sources, model preprocessing, the classifier and overlays. The
//! OpenCV camera and window live behind the `camera` feature and the ONNX
//! Runtime classifier behind `onnx`; replay of still images and the
//! headless overlay are always available.

pub mod config;
pub mod error;
pub mod tensor;
pub mod replay;
pub mod overlay;
pub mod models;
#[cfg(feature = "camera")]
pub mod camera;

pub use config::{VisionConfig, ChannelOrder};
pub use error::VisionError;
pub use tensor::TensorInput;
pub use replay::ImageSequenceSource;
pub use overlay::LogOverlay;
#[cfg(feature = "camera")]
pub use camera::CameraManager;
#[cfg(feature = "camera")]
pub use overlay::WindowOverlay;
#[cfg(feature = "onnx")]
pub use models::OnnxClassifier;
