pub mod detector;
pub mod manager;

pub use detector::{ObjectDetector, YoloDetector};
pub use manager::{ModelLoader, ModelManager, OnnxModelLoader};
