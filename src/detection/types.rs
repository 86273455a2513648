use crate::labels;
use crate::utils::error::DetectError;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Box in decoded-image pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One detection as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    /// Label from the fixed class table
    #[serde(rename = "class")]
    pub class_name: String,
    /// Score in [0, 1]
    pub confidence: f32,
}

/// Model output row: corner coordinates, score and class id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPrediction {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_index: usize,
}

impl RawPrediction {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

impl Detection {
    /// Unpack a corner-format prediction, resolving its class label.
    ///
    /// An index outside the label table means the model and the table disagree;
    /// that is reported instead of mislabelling the box.
    pub fn from_prediction(prediction: &RawPrediction) -> Result<Self> {
        let class_name = labels::class_name(prediction.class_index)
            .ok_or(DetectError::UnknownClass(prediction.class_index))?;

        Ok(Self {
            bbox: BoundingBox {
                x: prediction.x1,
                y: prediction.y1,
                width: prediction.x2 - prediction.x1,
                height: prediction.y2 - prediction.y1,
            },
            class_name: class_name.to_string(),
            confidence: prediction.confidence,
        })
    }
}

/// Lifecycle of the lazily loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Unloaded,
    Loaded,
}
