use crate::{
    detection::{Detection, RawPrediction},
    image::ImageLoader,
    models::ModelManager,
    utils::error::DetectError,
    Result,
};
use std::time::Instant;
use tokio::task;

/// Decode → load model (first call) → infer → unpack.
pub struct DetectionPipeline;

impl DetectionPipeline {
    /// Run detection on a data-URL encoded image.
    ///
    /// The image is decoded before the model is touched, so malformed payloads
    /// never trigger a model load.
    pub async fn process_data_url(
        models: &ModelManager,
        data_url: String,
        max_image_bytes: usize,
    ) -> Result<Vec<Detection>> {
        let start_time = Instant::now();

        let image =
            task::spawn_blocking(move || ImageLoader::from_data_url(&data_url, max_image_bytes))
                .await
                .map_err(join_error)??;
        let decode_time = start_time.elapsed();

        let detector = models.detector().await?;

        let inference_start = Instant::now();
        let predictions = task::spawn_blocking(move || detector.predict(&image))
            .await
            .map_err(join_error)??;
        let inference_time = inference_start.elapsed();

        let detections = Self::unpack(&predictions)?;

        tracing::info!(
            "Detection completed: detections={}, decode={:.3}s, inference={:.3}s, total={:.3}s",
            detections.len(),
            decode_time.as_secs_f32(),
            inference_time.as_secs_f32(),
            start_time.elapsed().as_secs_f32()
        );

        Ok(detections)
    }

    /// Convert model predictions into client detections, failing on the first
    /// class index the label table does not cover.
    pub fn unpack(predictions: &[RawPrediction]) -> Result<Vec<Detection>> {
        predictions.iter().map(Detection::from_prediction).collect()
    }
}

fn join_error(err: task::JoinError) -> DetectError {
    DetectError::Internal(format!("Worker task failed: {}", err))
}
