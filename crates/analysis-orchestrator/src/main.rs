//! run-pipeline: refresh every cached table once and print the step report.
//!
//! Usage:
//!   cargo run -p analysis-orchestrator --bin run-pipeline
//!   DATA_DIR=/srv/nifty SENTIMENT_BACKEND=lexicon cargo run -p analysis-orchestrator

use analysis_core::PipelineConfig;
use analysis_orchestrator::{Pipeline, Sources};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "analysis_orchestrator=info,data_loader=info,polygon_client=warn".into()),
        )
        .init();

    let config = PipelineConfig::from_env();
    tracing::info!("Refreshing {} into {}", config.ticker, config.paths.dir().display());

    let pipeline = Pipeline::new(&config, Sources::from_env(&config));
    let report = pipeline.run().await;
    println!("{}", report);

    if report.has_problems() {
        anyhow::bail!("pipeline finished with failed or blocked steps");
    }
    Ok(())
}
