//! Samples, detections and verdicts

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Label produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u8);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for ClassId {
    fn from(value: u8) -> Self {
        ClassId(value)
    }
}

/// Bounding box in normalized [0, 1] coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

/// Bounding box in pixel coordinates of a concrete frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl PixelRect {
    pub fn width(&self) -> i32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> i32 {
        self.ymax - self.ymin
    }
}

impl BoundingBox {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    /// Copy with every coordinate forced into [0, 1]. NaN becomes 0.
    pub fn clamped(&self) -> Self {
        fn unit(v: f32) -> f32 {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(0.0, 1.0)
            }
        }
        Self {
            xmin: unit(self.xmin),
            ymin: unit(self.ymin),
            xmax: unit(self.xmax),
            ymax: unit(self.ymax),
        }
    }

    /// Scale to pixel space of a `width` x `height` frame (truncating)
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
        let b = self.clamped();
        let (w, h) = (width as f32, height as f32);
        PixelRect {
            xmin: (b.xmin * w) as i32,
            ymin: (b.ymin * h) as i32,
            xmax: (b.xmax * w) as i32,
            ymax: (b.ymax * h) as i32,
        }
    }
}

/// Raw output of one inference call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: ClassId,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_id: ClassId, confidence: f32, bbox: BoundingBox) -> Self {
        Self { class_id, confidence, bbox }
    }

    /// Per-frame label drawn next to the box
    pub fn label(&self) -> String {
        format!("class {}, conf {:.2}", self.class_id, self.confidence)
    }
}

/// One classification pushed into the confirmation window.
///
/// `latency` is the wall time of the inference call that produced the
/// sample. It feeds latency reporting only and never the vote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationSample {
    class_id: ClassId,
    confidence: f32,
    latency: Duration,
}

impl ClassificationSample {
    pub fn new(class_id: ClassId, confidence: f32, latency: Duration) -> Result<Self> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidSample(format!(
                "confidence {} for class {} is outside [0, 1]",
                confidence, class_id
            )));
        }
        Ok(Self { class_id, confidence, latency })
    }

    pub fn from_detection(detection: &Detection, latency: Duration) -> Result<Self> {
        Self::new(detection.class_id, detection.confidence, latency)
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

/// A class confirmed by the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confirmation {
    pub class_id: ClassId,
    /// Mean confidence over the samples that voted for `class_id`
    pub mean_confidence: f32,
    /// Mean inference latency over the whole window
    pub mean_latency: Duration,
    /// How many samples in the window voted for `class_id`
    pub agreement: usize,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Detected: class {}, mean confidence {:.2}, mean time {:.2}s",
            self.class_id,
            self.mean_confidence,
            self.mean_latency.as_secs_f64()
        )
    }
}

/// Output of the confirmation window for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// The window is not full yet
    Unconfirmed,
    /// The window is full but no class reached the agreement threshold
    NoMatch { leader: ClassId, count: usize },
    /// A class reached the agreement threshold
    Confirmed(Confirmation),
}

impl Verdict {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Verdict::Confirmed(_))
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        match self {
            Verdict::Confirmed(c) => Some(c),
            _ => None,
        }
    }

    /// Text for the overlay banner, if the verdict warrants one
    pub fn banner(&self) -> Option<String> {
        match self {
            Verdict::Unconfirmed => None,
            Verdict::NoMatch { leader, count } => Some(format!(
                "Not identified (best: class {}, {} votes)",
                leader, count
            )),
            Verdict::Confirmed(c) => Some(c.to_string()),
        }
    }
}
