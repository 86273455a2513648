use axum::response::{IntoResponse, Response};
use std::path::PathBuf;
use thiserror::Error;

use crate::web::handlers::DetectResponse;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Class index {0} is outside the label table")]
    UnknownClass(usize),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Image too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl DetectError {
    pub fn error_code(&self) -> &'static str {
        match self {
            DetectError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            DetectError::Inference(_) => "INFERENCE_ERROR",
            DetectError::UnknownClass(_) => "UNKNOWN_CLASS",
            DetectError::InvalidInput(_) => "INVALID_INPUT",
            DetectError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            DetectError::Base64(_) => "BASE64_DECODE_ERROR",
            DetectError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            DetectError::Config(_) => "CONFIG_ERROR",
            DetectError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for failures caused by the request payload rather than the model.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DetectError::InvalidInput(_)
                | DetectError::FileTooLarge(_, _)
                | DetectError::Base64(_)
                | DetectError::ImageDecode(_)
        )
    }
}

/// Application failures keep HTTP 200 and report through the JSON envelope,
/// so browser clients only ever branch on `success`.
impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            tracing::warn!("Rejected detection request: {} ({})", self, self.error_code());
        } else {
            tracing::error!("Detection failed: {} ({})", self, self.error_code());
        }

        axum::Json(DetectResponse::failure(self.to_string())).into_response()
    }
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Weights file not found: {}", .0.display())]
    WeightsNotFound(PathBuf),

    #[error("Export step failed with exit code {}: {stderr}", display_code(.code))]
    ExportFailed { code: Option<i32>, stderr: String },

    #[error("'{0}' not found. Install it with 'pip install tensorflowjs'")]
    MissingConverterDependency(String),

    #[error("Web format conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

pub type ConvertResult<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_classified() {
        assert!(DetectError::InvalidInput("empty".into()).is_client_error());
        assert!(DetectError::FileTooLarge(10, 5).is_client_error());
        assert!(!DetectError::UnknownClass(9).is_client_error());
        assert!(!DetectError::ModelLoad("missing".into()).is_client_error());
    }

    #[test]
    fn test_export_failure_message_includes_code() {
        let err = ConvertError::ExportFailed {
            code: Some(2),
            stderr: "no such file".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("exit code 2"));
        assert!(message.contains("no such file"));

        let killed = ConvertError::ExportFailed { code: None, stderr: String::new() };
        assert!(killed.to_string().contains("exit code none"));
    }

    #[test]
    fn test_missing_dependency_is_actionable() {
        let err = ConvertError::MissingConverterDependency("tensorflowjs_converter".into());
        assert!(err.to_string().contains("pip install tensorflowjs"));
    }
}
