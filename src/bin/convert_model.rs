use clap::Parser;
use sign_detect::convert::{ConversionRequest, ExportToolchain, ModelConverter, SystemRunner};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "convert-model")]
#[command(about = "Convert YOLOv5 weights to a TensorFlow.js graph model")]
struct Args {
    /// PyTorch model weights path
    #[arg(long, default_value = "best.pt")]
    weights: PathBuf,

    /// Output directory for the TF.js model
    #[arg(long, default_value = "./public/model")]
    output: PathBuf,

    /// Python interpreter used to run the export script
    #[arg(long, default_value = ExportToolchain::DEFAULT_PYTHON)]
    python: String,

    /// YOLOv5 export script
    #[arg(long, default_value = ExportToolchain::DEFAULT_EXPORT_SCRIPT)]
    export_script: PathBuf,

    /// SavedModel to TF.js converter program
    #[arg(long, default_value = ExportToolchain::DEFAULT_WEB_CONVERTER)]
    web_converter: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    let toolchain = ExportToolchain {
        python: args.python,
        export_script: args.export_script,
        web_converter: args.web_converter,
    };
    let request = ConversionRequest::new(args.weights, args.output);

    match ModelConverter::new(SystemRunner, toolchain).convert(&request).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Conversion failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
