use crate::config::{Config, InferenceConfig};
use crate::detection::RawPrediction;
use crate::image::{ImagePreprocessor, YoloDecoder};
use crate::utils::error::DetectError;
use crate::Result;
use image::RgbImage;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::time::Instant;

/// Anything that turns an RGB image into corner-format predictions.
pub trait ObjectDetector: Send + Sync {
    fn predict(&self, image: &RgbImage) -> Result<Vec<RawPrediction>>;
}

/// YOLOv5 ONNX export running on ONNX Runtime.
pub struct YoloDetector {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    inference: InferenceConfig,
}

impl YoloDetector {
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = &config.model_path;

        if !model_path.exists() {
            return Err(DetectError::ModelLoad(format!(
                "Detection model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading detection model from: {}", model_path.display());

        let session = Session::builder()
            .map_err(load_error)?
            .with_optimization_level(optimization_level(config.onnx_config.optimization_level))
            .map_err(load_error)?
            .with_intra_threads(config.onnx_config.intra_threads)
            .map_err(load_error)?
            .commit_from_file(model_path)
            .map_err(load_error)?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => {
                return Err(DetectError::ModelLoad(
                    "Detection model has no inputs".to_string(),
                ))
            }
        };

        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(DetectError::ModelLoad(
                    "Detection model has no outputs".to_string(),
                ))
            }
        };

        tracing::info!("Detection model input: '{}', output: '{}'", input_name, output_name);
        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Detection output[{}]: '{}'", i, output.name);
        }

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            inference: config.inference_config.clone(),
        })
    }
}

impl ObjectDetector for YoloDetector {
    fn predict(&self, image: &RgbImage) -> Result<Vec<RawPrediction>> {
        let start = Instant::now();
        let (tensor, letterbox) = ImagePreprocessor::letterbox(image, self.inference.input_size);
        let input = Tensor::from_array(tensor).map_err(|e| DetectError::Inference(e.to_string()))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs![self.input_name.as_str() => input])
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let output = match outputs.get(self.output_name.as_str()) {
            Some(output) => output,
            None => {
                let available: Vec<String> = outputs.keys().map(|k| k.to_string()).collect();
                return Err(DetectError::Inference(format!(
                    "Output '{}' not found. Available outputs: {:?}",
                    self.output_name, available
                )));
            }
        };

        let prediction = output
            .try_extract_array::<f32>()
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let boxes = YoloDecoder::decode(&prediction, &letterbox, &self.inference)?;

        tracing::debug!(
            "Inference produced {} boxes in {:.3}s",
            boxes.len(),
            start.elapsed().as_secs_f32()
        );
        Ok(boxes)
    }
}

fn load_error(err: impl std::fmt::Display) -> DetectError {
    DetectError::ModelLoad(err.to_string())
}

fn optimization_level(level: i32) -> GraphOptimizationLevel {
    match level {
        i32::MIN..=0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file_is_a_load_error() {
        let config = Config {
            model_path: "does/not/exist.onnx".into(),
            ..Config::default()
        };
        let err = YoloDetector::new(&config).err().unwrap();
        assert!(matches!(err, DetectError::ModelLoad(_)));
        assert!(err.to_string().contains("does/not/exist.onnx"));
    }
}
