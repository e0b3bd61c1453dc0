//! HTTP API over the cached pipeline tables.
//!
//! Handlers only read the CSV tables. Table writes are atomic renames, so
//! reads never block on a refresh; refreshes themselves are serialized by
//! the pipeline mutex.

use analysis_core::{AnalysisError, PipelineConfig};
use analysis_orchestrator::{Pipeline, Sources};
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    Json, Router,
};
use market_store::MarketStore;
use ml_client::{MLClient, MLConfig};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod market_routes;
mod pipeline_routes;
mod request_id;

pub use market_routes::market_routes;
pub use pipeline_routes::pipeline_routes;
pub use request_id::{request_id_middleware, request_span, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PipelineConfig>,
    pub store: MarketStore,
    /// Held for the duration of a refresh
    pub pipeline: Arc<Mutex<Pipeline>>,
    /// Model services probed by `/health`
    pub models: Option<MLClient>,
}

impl AppState {
    pub fn new(config: PipelineConfig, pipeline: Pipeline) -> Self {
        Self {
            store: MarketStore::new(config.paths.clone()),
            config: Arc::new(config),
            pipeline: Arc::new(Mutex::new(pipeline)),
            models: None,
        }
    }

    pub fn with_models(mut self, models: MLClient) -> Self {
        self.models = Some(models);
        self
    }
}

/// Error rendered as `{"error": message}`
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}", self.error);
        }
        (
            self.status,
            Json(serde_json::json!({ "error": self.error.to_string() })),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err)
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        let status = if err.is_missing_artifact() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::with_status(status, err.into())
    }
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(market_routes())
        .merge(pipeline_routes())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// Load configuration, refresh every table once, then serve.
pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_server=info,analysis_orchestrator=info,tower_http=info".into()),
        )
        .init();

    let config = PipelineConfig::from_env();
    let pipeline = Pipeline::new(&config, Sources::from_env(&config));

    tracing::info!("Running startup refresh into {}", config.paths.dir().display());
    let report = pipeline.run().await;
    if report.has_problems() {
        tracing::warn!("Startup refresh incomplete, serving last-known data:\n{}", report);
    }

    let state = AppState::new(config, pipeline).with_models(MLClient::new(MLConfig::default()));
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
