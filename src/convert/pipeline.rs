use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::convert::{Invocation, ModelMetadata, ProcessRunner};
use crate::utils::error::{ConvertError, ConvertResult};

const SAVED_MODEL_SUFFIX: &str = "_saved_model";

/// What to convert and where the web model goes.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub weights_path: PathBuf,
    pub output_dir: PathBuf,
}

impl ConversionRequest {
    pub fn new(weights_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            weights_path: weights_path.into(),
            output_dir: output_dir.into(),
        }
    }
}

/// External programs used by the two conversion steps.
#[derive(Debug, Clone)]
pub struct ExportToolchain {
    /// Python interpreter that runs the export script
    pub python: String,
    /// YOLOv5 `export.py`
    pub export_script: PathBuf,
    /// SavedModel to web-format converter
    pub web_converter: String,
}

impl ExportToolchain {
    #[cfg(target_os = "windows")]
    pub const DEFAULT_PYTHON: &'static str = "python";
    #[cfg(not(target_os = "windows"))]
    pub const DEFAULT_PYTHON: &'static str = "python3";

    pub const DEFAULT_EXPORT_SCRIPT: &'static str = "export.py";
    pub const DEFAULT_WEB_CONVERTER: &'static str = "tensorflowjs_converter";
}

impl Default for ExportToolchain {
    fn default() -> Self {
        Self {
            python: Self::DEFAULT_PYTHON.to_string(),
            export_script: PathBuf::from(Self::DEFAULT_EXPORT_SCRIPT),
            web_converter: Self::DEFAULT_WEB_CONVERTER.to_string(),
        }
    }
}

/// Files produced by a successful run.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub artifact_path: PathBuf,
    pub metadata_path: PathBuf,
}

/// Path the exporter writes its SavedModel to: the weights file name up to
/// the first `.`, suffixed with `_saved_model`, beside the weights.
pub fn saved_model_path(weights_path: &Path) -> PathBuf {
    let file_name = weights_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name.split('.').next().unwrap_or_default();
    let artifact = format!("{}{}", stem, SAVED_MODEL_SUFFIX);

    match weights_path.parent() {
        Some(parent) => parent.join(artifact),
        None => PathBuf::from(artifact),
    }
}

/// Weights → SavedModel → web graph model, then `metadata.json`.
pub struct ModelConverter<R> {
    runner: R,
    toolchain: ExportToolchain,
}

impl<R: ProcessRunner> ModelConverter<R> {
    pub fn new(runner: R, toolchain: ExportToolchain) -> Self {
        Self { runner, toolchain }
    }

    pub async fn convert(&self, request: &ConversionRequest) -> ConvertResult<ConversionOutcome> {
        let start_time = Instant::now();

        if !request.weights_path.is_file() {
            return Err(ConvertError::WeightsNotFound(request.weights_path.clone()));
        }

        tokio::fs::create_dir_all(&request.output_dir).await?;

        let artifact_path = self.export_saved_model(&request.weights_path).await?;
        self.convert_to_web(&artifact_path, &request.output_dir).await?;

        let metadata_path = ModelMetadata::default().write_to(&request.output_dir).await?;

        info!(
            "Conversion completed in {:.1}s. Model and metadata saved to {}",
            start_time.elapsed().as_secs_f32(),
            request.output_dir.display()
        );

        Ok(ConversionOutcome {
            artifact_path,
            metadata_path,
        })
    }

    async fn export_saved_model(&self, weights_path: &Path) -> ConvertResult<PathBuf> {
        info!("Converting {} to TensorFlow SavedModel format...", weights_path.display());

        let invocation = Invocation::new(&self.toolchain.python)
            .path_arg(&self.toolchain.export_script)
            .arg("--weights")
            .path_arg(weights_path)
            .args(["--include", "saved_model", "--dynamic"]);

        let output = self.runner.run(&invocation).await?;
        debug!("Export output:\n{}", output.stdout);
        if !output.success() {
            return Err(ConvertError::ExportFailed {
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let artifact_path = saved_model_path(weights_path);
        if !artifact_path.exists() {
            return Err(ConvertError::ConversionFailed(format!(
                "export finished but {} was not created",
                artifact_path.display()
            )));
        }

        info!("SavedModel written to {}", artifact_path.display());
        Ok(artifact_path)
    }

    async fn convert_to_web(&self, artifact_path: &Path, output_dir: &Path) -> ConvertResult<()> {
        info!("Converting SavedModel to TensorFlow.js format...");

        let web_converter = &self.toolchain.web_converter;
        let converter = self
            .runner
            .locate(web_converter)
            .ok_or_else(|| ConvertError::MissingConverterDependency(web_converter.clone()))?;

        let invocation = Invocation::new(converter.to_string_lossy())
            .args(["--input_format=tf_saved_model", "--output_format=tfjs_graph_model"])
            .path_arg(artifact_path)
            .path_arg(output_dir);

        let output = self.runner.run(&invocation).await?;
        debug!("Web conversion output:\n{}", output.stdout);
        if !output.success() {
            let detail = output.stderr.trim();
            return Err(ConvertError::ConversionFailed(if detail.is_empty() {
                format!("converter exited with code {:?}", output.code)
            } else {
                detail.to_string()
            }));
        }

        info!("TensorFlow.js model saved to {}", output_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_model_path_sits_beside_weights() {
        assert_eq!(
            saved_model_path(Path::new("runs/train/best.pt")),
            PathBuf::from("runs/train/best_saved_model")
        );
        assert_eq!(saved_model_path(Path::new("best.pt")), PathBuf::from("best_saved_model"));
    }

    #[test]
    fn test_saved_model_path_cuts_at_first_dot() {
        assert_eq!(
            saved_model_path(Path::new("weights/model.v2.pt")),
            PathBuf::from("weights/model_saved_model")
        );
    }

    #[test]
    fn test_default_toolchain() {
        let toolchain = ExportToolchain::default();
        assert_eq!(toolchain.export_script, PathBuf::from("export.py"));
        assert_eq!(toolchain.web_converter, "tensorflowjs_converter");
        assert!(toolchain.python.starts_with("python"));
    }
}
