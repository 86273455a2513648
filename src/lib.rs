pub mod config;
pub mod convert;
pub mod detection;
pub mod image;
pub mod labels;
pub mod models;
pub mod utils;
pub mod web;

// Re-export the main types
pub use config::Config;
pub use detection::Detection;
pub use utils::error::{ConvertError, DetectError};

pub type Result<T> = std::result::Result<T, DetectError>;
