use analysis_orchestrator::PipelineReport;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::AppState;

pub fn pipeline_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/refresh", post(refresh))
}

/// Liveness plus, when configured, reachability of each model service.
/// A down model service does not fail the check; the pipeline keeps the
/// last forecast in that case.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let models = match &state.models {
        Some(client) => Some(client.health().await),
        None => None,
    };

    Json(json!({
        "status": "ok",
        "ticker": state.config.ticker,
        "refreshing": state.pipeline.try_lock().is_err(),
        "models": models,
    }))
}

/// Re-run the pipeline. A request arriving during a refresh waits for it to
/// finish and then runs its own.
async fn refresh(State(state): State<AppState>) -> Json<PipelineReport> {
    let pipeline = state.pipeline.lock().await;
    tracing::info!("Refresh requested");
    Json(pipeline.run().await)
}

#[cfg(test)]
mod tests {
    use crate::{app, AppState};
    use analysis_core::{AnalysisError, PipelineConfig};
    use analysis_orchestrator::{Pipeline, PipelineStep};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use ml_client::{MLClient, MLConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl PipelineStep for Counting {
        fn name(&self) -> &'static str {
            "count"
        }

        async fn execute(&self) -> Result<String, AnalysisError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("run {}", n))
        }
    }

    fn state_with_counter() -> (AppState, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let dir = std::env::temp_dir().join(format!("api-refresh-{}", uuid::Uuid::new_v4()));
        let pipeline = Pipeline::with_steps(vec![Box::new(Counting(runs.clone()))]);
        (AppState::new(PipelineConfig::default().with_data_dir(dir), pipeline), runs)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = state_with_counter();
        let response = app(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["refreshing"], false);
        assert!(body["models"].is_null());
    }

    #[tokio::test]
    async fn test_health_reports_model_services() {
        let mut sentiment = mockito::Server::new_async().await;
        let mut predictor = mockito::Server::new_async().await;
        sentiment
            .mock("GET", "/health")
            .with_status(503)
            .create_async()
            .await;
        predictor
            .mock("GET", "/health")
            .with_status(200)
            .create_async()
            .await;

        let (state, _) = state_with_counter();
        let state = state.with_models(MLClient::new(MLConfig {
            sentiment_url: sentiment.url(),
            price_predictor_url: predictor.url(),
            timeout: Duration::from_secs(2),
        }));
        let response = app(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["models"]["sentiment"], false);
        assert_eq!(body["models"]["price_predictor"], true);
    }

    #[tokio::test]
    async fn test_refresh_runs_pipeline_and_returns_report() {
        let (state, runs) = state_with_counter();
        let request = || {
            Request::builder()
                .method(Method::POST)
                .uri("/refresh")
                .body(Body::empty())
                .unwrap()
        };

        let response = app(state.clone()).oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["steps"][0]["step"], "count");
        assert_eq!(body["steps"][0]["outcome"]["status"], "completed");
        assert_eq!(body["steps"][0]["outcome"]["detail"], "run 1");

        let (a, b) = tokio::join!(
            app(state.clone()).oneshot(request()),
            app(state.clone()).oneshot(request())
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_refresh_is_post_only() {
        let (state, runs) = state_with_counter();
        let response = app(state)
            .oneshot(Request::builder().uri("/refresh").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
