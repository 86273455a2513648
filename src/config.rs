use crate::utils::error::DetectError;
use crate::Result;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MODEL_PATH: &str = "models/best.onnx";

#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub bind_addr: SocketAddr,

    /// Detection model weights (ONNX export)
    pub model_path: PathBuf,

    /// ONNX Runtime settings
    pub onnx_config: OnnxConfig,

    /// Inference thresholds
    pub inference_config: InferenceConfig,

    /// HTTP settings
    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU threads per session
    pub intra_threads: usize,

    /// Graph optimization level (0-3)
    pub optimization_level: i32,
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Square model input edge in pixels
    pub input_size: u32,

    /// Minimum score for a box to be returned
    pub confidence_threshold: f32,

    /// IoU above which overlapping same-class boxes are suppressed
    pub iou_threshold: f32,

    /// Upper bound on boxes returned per image
    pub max_detections: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
            max_detections: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum request body size (bytes)
    pub max_request_size: usize,
}

impl Config {
    pub fn new(port: u16, model_path: impl Into<PathBuf>, max_body_mb: usize) -> Result<Self> {
        if max_body_mb == 0 {
            return Err(DetectError::Config(
                "Request body limit must be at least 1 MB".to_string(),
            ));
        }

        let cpu_cores = num_cpus::get();

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1),
            optimization_level: 3,
        };

        let max_request_size = max_body_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            DetectError::Config(format!("Request body limit of {} MB is too large", max_body_mb))
        })?;

        let server_config = ServerConfig { max_request_size };

        Ok(Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
            model_path: model_path.into(),
            onnx_config,
            inference_config: InferenceConfig::default(),
            server_config,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            onnx_config: OnnxConfig {
                intra_threads: 1,
                optimization_level: 3,
            },
            inference_config: InferenceConfig::default(),
            server_config: ServerConfig {
                max_request_size: 50 * 1024 * 1024,
            },
        }
    }
}
