//! PDF pipeline MCP server - Entry point
//!
//! Positional arguments are directories that path sources and outputs are
//! confined to. Pipeline settings come from `PDF_PIPELINE_*` variables.

use pdf_pipeline::{run_server_with_config, PipelineConfig, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ServerConfig {
        resource_dirs: std::env::args().skip(1).collect(),
        pipeline: PipelineConfig::from_env(),
    };
    tracing::info!(
        resource_dirs = ?config.resource_dirs,
        temp_root = %config.pipeline.temp_root.display(),
        engine = ?config.pipeline.compression_engine,
        "Starting PDF pipeline server"
    );

    run_server_with_config(config).await
}
