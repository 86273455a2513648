//! Weights-to-web model conversion.

pub mod metadata;
pub mod pipeline;
pub mod runner;

pub use metadata::{ModelMetadata, METADATA_FILE_NAME};
pub use pipeline::{
    saved_model_path, ConversionOutcome, ConversionRequest, ExportToolchain, ModelConverter,
};
pub use runner::{Invocation, ProcessOutput, ProcessRunner, SystemRunner};
