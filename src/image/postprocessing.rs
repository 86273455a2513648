use crate::config::InferenceConfig;
use crate::detection::RawPrediction;
use crate::image::preprocessing::Letterbox;
use crate::utils::error::DetectError;
use crate::Result;
use ndarray::{ArrayViewD, Axis, Ix2};
use std::cmp::Ordering;

/// Class offset for batched NMS: boxes of different classes never overlap.
const CLASS_OFFSET: f32 = 7680.0;

/// Leading values per YOLOv5 row before the class scores.
const BOX_FIELDS: usize = 5;

pub struct YoloDecoder;

impl YoloDecoder {
    /// Decode a YOLOv5 output tensor of shape `(1, candidates, 5 + classes)`.
    ///
    /// Rows are `[cx, cy, w, h, objectness, class scores...]` in letterboxed
    /// model-input pixels. Returned boxes are in source-image pixels, sorted by
    /// confidence, highest first.
    pub fn decode(
        output: &ArrayViewD<f32>,
        letterbox: &Letterbox,
        config: &InferenceConfig,
    ) -> Result<Vec<RawPrediction>> {
        let shape = output.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[2] <= BOX_FIELDS {
            return Err(DetectError::Inference(format!(
                "Unexpected detection output shape {:?}, expected (1, candidates, 5 + classes)",
                shape
            )));
        }

        let rows = output
            .index_axis(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let mut candidates = Vec::new();
        for row in rows.axis_iter(Axis(0)) {
            let objectness = row[4];
            if objectness < config.confidence_threshold {
                continue;
            }

            let Some((class_index, class_score)) = row
                .iter()
                .skip(BOX_FIELDS)
                .copied()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
            else {
                continue;
            };

            let confidence = objectness * class_score;
            if confidence < config.confidence_threshold {
                continue;
            }

            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            candidates.push(RawPrediction {
                x1: cx - w / 2.0,
                y1: cy - h / 2.0,
                x2: cx + w / 2.0,
                y2: cy + h / 2.0,
                confidence,
                class_index,
            });
        }

        tracing::debug!(
            "{} candidates above threshold {}",
            candidates.len(),
            config.confidence_threshold
        );

        let kept = non_maximum_suppression(candidates, config.iou_threshold, config.max_detections);

        Ok(kept
            .into_iter()
            .map(|p| RawPrediction {
                x1: letterbox.unmap_x(p.x1),
                y1: letterbox.unmap_y(p.y1),
                x2: letterbox.unmap_x(p.x2),
                y2: letterbox.unmap_y(p.y2),
                ..p
            })
            .collect())
    }
}

/// Intersection over union of two corner-format boxes.
pub fn compute_iou(a: &RawPrediction, b: &RawPrediction) -> f32 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter_area = inter_w * inter_h;

    let union_area = a.area() + b.area() - inter_area;
    if union_area <= 0.0 {
        0.0
    } else {
        inter_area / union_area
    }
}

/// Class-aware greedy NMS. Output is sorted by confidence, descending.
pub fn non_maximum_suppression(
    mut predictions: Vec<RawPrediction>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawPrediction> {
    predictions.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));

    let offset = |p: &RawPrediction| {
        let shift = p.class_index as f32 * CLASS_OFFSET;
        RawPrediction {
            x1: p.x1 + shift,
            y1: p.y1 + shift,
            x2: p.x2 + shift,
            y2: p.y2 + shift,
            ..*p
        }
    };

    let mut kept: Vec<RawPrediction> = Vec::new();
    for candidate in predictions {
        if kept.len() >= max_detections {
            break;
        }
        let shifted = offset(&candidate);
        let overlaps = kept
            .iter()
            .any(|k| compute_iou(&offset(k), &shifted) > iou_threshold);
        if !overlaps {
            kept.push(candidate);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn pred(
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        confidence: f32,
        class_index: usize,
    ) -> RawPrediction {
        RawPrediction { x1, y1, x2, y2, confidence, class_index }
    }

    fn identity_letterbox() -> Letterbox {
        Letterbox::new(640, 640, 640)
    }

    #[test]
    fn test_iou() {
        let a = pred(0.0, 0.0, 10.0, 10.0, 1.0, 0);
        let b = pred(5.0, 0.0, 15.0, 10.0, 1.0, 0);
        assert!((compute_iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(compute_iou(&a, &pred(20.0, 20.0, 30.0, 30.0, 1.0, 0)), 0.0);
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap_only() {
        let boxes = vec![
            pred(0.0, 0.0, 100.0, 100.0, 0.7, 1),
            pred(2.0, 2.0, 102.0, 102.0, 0.9, 1),
            pred(1.0, 1.0, 101.0, 101.0, 0.8, 2),
        ];
        let kept = non_maximum_suppression(boxes, 0.45, 1000);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[0].class_index, 1);
        assert_eq!(kept[1].class_index, 2);
    }

    #[test]
    fn test_nms_respects_max_detections() {
        let boxes = (0..5)
            .map(|i| pred(i as f32 * 50.0, 0.0, i as f32 * 50.0 + 10.0, 10.0, 0.9, 0))
            .collect();
        assert_eq!(non_maximum_suppression(boxes, 0.45, 3).len(), 3);
    }

    #[test]
    fn test_decode_scores_and_threshold() {
        let mut output = Array3::<f32>::zeros((1, 3, 5 + 6));
        // objectness 0.9, class 3 score 0.8 -> 0.72
        output[[0, 0, 0]] = 100.0;
        output[[0, 0, 1]] = 200.0;
        output[[0, 0, 2]] = 40.0;
        output[[0, 0, 3]] = 20.0;
        output[[0, 0, 4]] = 0.9;
        output[[0, 0, 5 + 3]] = 0.8;
        // objectness passes, product does not: 0.6 * 0.6 = 0.36
        output[[0, 1, 2]] = 10.0;
        output[[0, 1, 3]] = 10.0;
        output[[0, 1, 4]] = 0.6;
        output[[0, 1, 5]] = 0.6;
        // objectness below threshold
        output[[0, 2, 4]] = 0.1;
        output[[0, 2, 5]] = 1.0;

        let config = InferenceConfig::default();
        let view = output.into_dyn();
        let predictions =
            YoloDecoder::decode(&view.view(), &identity_letterbox(), &config).unwrap();

        assert_eq!(predictions.len(), 1);
        let p = predictions[0];
        assert_eq!(p.class_index, 3);
        assert!((p.confidence - 0.72).abs() < 1e-5);
        assert_eq!((p.x1, p.y1, p.x2, p.y2), (80.0, 190.0, 120.0, 210.0));
    }

    #[test]
    fn test_decode_maps_back_through_letterbox() {
        let mut output = Array3::<f32>::zeros((1, 1, 5 + 6));
        output[[0, 0, 0]] = 320.0;
        output[[0, 0, 1]] = 320.0;
        output[[0, 0, 2]] = 100.0;
        output[[0, 0, 3]] = 100.0;
        output[[0, 0, 4]] = 1.0;
        output[[0, 0, 5]] = 1.0;

        // 1280x640 source: scale 0.5, 160px vertical padding
        let letterbox = Letterbox::new(1280, 640, 640);
        let view = output.into_dyn();
        let predictions =
            YoloDecoder::decode(&view.view(), &letterbox, &InferenceConfig::default()).unwrap();

        let p = predictions[0];
        assert!((p.x1 - 540.0).abs() < 1e-3);
        assert!((p.x2 - 740.0).abs() < 1e-3);
        assert!((p.y1 - 220.0).abs() < 1e-3);
        assert!((p.y2 - 420.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_rejects_unexpected_shape() {
        let output = Array3::<f32>::zeros((1, 4, 3)).into_dyn();
        let config = InferenceConfig::default();
        let err = YoloDecoder::decode(&output.view(), &identity_letterbox(), &config)
            .unwrap_err();
        assert!(matches!(err, DetectError::Inference(_)));
    }
}
