use crate::{
    detection::{Detection, DetectionPipeline},
    web::{extractors::ValidatedJson, AppState},
    Result,
};
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

/// JSON request body: a data URL produced by `canvas.toDataURL()`.
#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub image: String,
}

/// Response envelope shared by success and failure.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detections: Option<Vec<Detection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectResponse {
    pub fn success(detections: Vec<Detection>) -> Self {
        Self {
            success: true,
            detections: Some(detections),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            detections: None,
            error: Some(message.into()),
        }
    }
}

/// `POST /detect`
pub async fn detect_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<DetectRequest>,
) -> Result<Json<DetectResponse>> {
    tracing::debug!("Received image payload: {} chars", request.image.len());

    let detections = DetectionPipeline::process_data_url(
        &state.models,
        request.image,
        state.config.server_config.max_request_size,
    )
    .await?;

    Ok(Json(DetectResponse::success(detections)))
}
