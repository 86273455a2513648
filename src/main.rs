use anyhow::Result;
use clap::Parser;
use sign_detect::{
    config::{Config, DEFAULT_MODEL_PATH, DEFAULT_PORT},
    web::serve,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sign-detect")]
#[command(about = "Sign-language gesture detection service")]
struct Args {
    /// Port to listen on (all interfaces)
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Detection model weights (ONNX)
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Maximum request body size in megabytes
    #[arg(long, default_value_t = 50)]
    max_body_mb: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting sign detection service...");

    let config = Config::new(args.port, args.model, args.max_body_mb)?;

    serve(config).await?;

    Ok(())
}
