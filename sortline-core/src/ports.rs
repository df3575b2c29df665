//! Boundaries to the camera, the model and the display

use crate::error::{FrameAcquisitionError, InferenceError};
use crate::types::{Detection, Verdict};

/// Source of frames for the control loop
pub trait FrameSource {
    type Frame;

    /// Block until the next frame is available.
    ///
    /// An error means no further frames will arrive.
    fn acquire(&mut self) -> Result<Self::Frame, FrameAcquisitionError>;

    /// Release the underlying device. Called once at shutdown.
    fn release(&mut self);
}

/// One-shot call into the vision model
pub trait InferencePort<F> {
    fn classify(&mut self, frame: &F) -> Result<Detection, InferenceError>;
}

/// What the overlay wants the loop to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayAction {
    Continue,
    /// The operator pressed the exit key
    Exit,
}

/// Data drawn over a frame: the latest detection and the verdict it led to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAnnotation {
    pub detection: Detection,
    pub verdict: Verdict,
}

/// Renders informational output for each frame
pub trait Overlay<F> {
    /// `annotation` is the most recent successful tick, if any.
    fn render(&mut self, frame: &mut F, annotation: Option<&FrameAnnotation>) -> OverlayAction;

    /// Tear down any window or surface. Called once at shutdown.
    fn close(&mut self) {}
}
