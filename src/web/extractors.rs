use axum::{
    async_trait,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::web::handlers::{DetectRequest, DetectResponse};

/// JSON extractor that also runs `Validate` on the parsed body.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: for<'de> Deserialize<'de> + Validate,
    S: Send + Sync,
{
    type Rejection = ValidationError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| ValidationError::JsonParse(err.body_text()))?;

        value.validate().map_err(|err| ValidationError::Validation(err.to_string()))?;

        Ok(ValidatedJson(value))
    }
}

pub trait Validate {
    type Error: std::fmt::Display;

    fn validate(&self) -> Result<(), Self::Error>;
}

#[derive(Debug)]
pub enum ValidationError {
    JsonParse(String),
    Validation(String),
}

/// Shape errors use the same HTTP 200 envelope as detection failures.
impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        tracing::warn!("Rejected request body: {}", self);

        Json(DetectResponse::failure(self.to_string())).into_response()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::JsonParse(msg) => write!(f, "JSON parse error: {}", msg),
            ValidationError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl Validate for DetectRequest {
    type Error = String;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.image.trim().is_empty() {
            return Err("Image data cannot be empty".to_string());
        }

        Ok(())
    }
}
