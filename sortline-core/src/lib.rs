//! sortline-core: decision logic for the SortLine sorter
//!
//! Provides:
//! - Classification samples and per-frame detections
//! - The confirmation window (sliding majority vote)
//! - Verdicts derived from the window
//! - Port traits for frame sources, inference and overlays

pub mod error;
pub mod types;
pub mod window;
pub mod ports;
pub mod config;

pub use error::{Error, Result, FrameAcquisitionError, InferenceError};
pub use types::{ClassId, BoundingBox, PixelRect, Detection, ClassificationSample, Confirmation, Verdict};
pub use window::ConfirmationWindow;
pub use ports::{FrameSource, InferencePort, Overlay, OverlayAction, FrameAnnotation};
pub use config::{WindowConfig, MAX_WINDOW_CAPACITY};
