//! Label table and model descriptor shared by the server and the converter.
//!
//! Index order must match the class ids the detection model was trained with.

pub const CLASS_NAMES: [&str; 6] = ["Hello", "IloveYou", "No", "Please", "Thanks", "Yes"];

pub const MODEL_TYPE: &str = "yolov5";

/// Model input as `[width, height, channels]`.
pub const INPUT_SHAPE: [u32; 3] = [640, 640, 3];

pub fn class_name(index: usize) -> Option<&'static str> {
    CLASS_NAMES.get(index).copied()
}
