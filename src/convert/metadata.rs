use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::labels::{CLASS_NAMES, INPUT_SHAPE, MODEL_TYPE};
use crate::utils::error::ConvertResult;

pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Descriptor written next to the converted model for the browser client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub class_names: Vec<String>,
    pub model_type: String,
    pub input_shape: [u32; 3],
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            class_names: CLASS_NAMES.iter().map(|name| name.to_string()).collect(),
            model_type: MODEL_TYPE.to_string(),
            input_shape: INPUT_SHAPE,
        }
    }
}

impl ModelMetadata {
    /// Write `metadata.json` into `dir`, replacing any previous file.
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> ConvertResult<PathBuf> {
        let path = dir.as_ref().join(METADATA_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let value = serde_json::to_value(ModelMetadata::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "classNames": ["Hello", "IloveYou", "No", "Please", "Thanks", "Yes"],
                "modelType": "yolov5",
                "inputShape": [640, 640, 3]
            })
        );
    }

    #[tokio::test]
    async fn test_write_uses_two_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = ModelMetadata::default().write_to(dir.path()).await.unwrap();

        assert_eq!(path, dir.path().join("metadata.json"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"classNames\": ["));
    }
}
