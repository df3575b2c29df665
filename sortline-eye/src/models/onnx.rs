//! ONNX Runtime classifier

use super::decode_outputs;
use crate::config::{ChannelOrder, VisionConfig};
use crate::error::VisionError;
use crate::tensor::TensorInput;
use ort::session::Session;
use ort::value::Tensor;
use sortline_core::{Detection, InferenceError, InferencePort};
use std::path::Path;
use tracing::{debug, info};

/// Image classifier with a bounding-box head, run through ONNX Runtime
pub struct OnnxClassifier {
    session: Session,
    input_size: (u32, u32),
    channel_order: ChannelOrder,
}

impl OnnxClassifier {
    /// Load the model named in the config
    pub fn load(config: &VisionConfig) -> Result<Self, VisionError> {
        Self::from_file(&config.model_path, config.input_size, config.channel_order)
    }

    pub fn from_file(
        model_path: &Path,
        input_size: (u32, u32),
        channel_order: ChannelOrder,
    ) -> Result<Self, VisionError> {
        if !model_path.exists() {
            return Err(VisionError::Model(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| VisionError::Ort(format!("Failed to create session builder: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load classifier: {}", e)))?;

        info!("Classifier loaded from {:?}", model_path);

        Ok(Self {
            session,
            input_size,
            channel_order,
        })
    }

    /// Run the model on one frame
    pub fn detect<F: TensorInput>(&mut self, frame: &F) -> Result<Detection, VisionError> {
        let data = frame.to_input_tensor(self.input_size, self.channel_order)?;
        let (width, height) = self.input_size;
        let shape = [1usize, height as usize, width as usize, 3];

        let input = Tensor::from_array((shape, data))
            .map_err(|e| VisionError::Ort(format!("Failed to create input tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::Ort(format!("Inference failed: {}", e)))?;

        if outputs.len() < 2 {
            return Err(VisionError::Model(format!(
                "Expected 2 outputs (scores, bbox), got {}",
                outputs.len()
            )));
        }

        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Ort(format!("Failed to read class scores: {}", e)))?;
        let (_, bbox) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Ort(format!("Failed to read bounding box: {}", e)))?;

        let detection = decode_outputs(scores, bbox)?;
        debug!("Classified frame: {}", detection.label());
        Ok(detection)
    }
}

impl<F: TensorInput> InferencePort<F> for OnnxClassifier {
    fn classify(&mut self, frame: &F) -> Result<Detection, InferenceError> {
        self.detect(frame).map_err(InferenceError::from)
    }
}
