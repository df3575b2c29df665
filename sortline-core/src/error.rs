use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid sample: {0}")]
    InvalidSample(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A frame could not be acquired. Ends the control loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Frame acquisition failed: {0}")]
pub struct FrameAcquisitionError(pub String);

/// The model could not classify a frame. The tick is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Inference failed: {0}")]
pub struct InferenceError(pub String);

impl From<Error> for InferenceError {
    fn from(err: Error) -> Self {
        InferenceError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Configuration("capacity must be positive".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("capacity must be positive"));
    }

    #[test]
    fn test_invalid_sample_into_inference_error() {
        let err: InferenceError = Error::InvalidSample("confidence 1.5".to_string()).into();
        assert!(err.to_string().starts_with("Inference failed"));
        assert!(err.0.contains("confidence 1.5"));
    }
}
