//! Axum server exposing the classification ingress.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::error;

use crate::domain::{IndicatorOpsError, Result};

use super::handler::ClassificationIngress;
use super::models::{ClassifyBatchRequest, ClassifyBatchResponse};

#[derive(Clone)]
struct IngressState {
    handler: Arc<dyn ClassificationIngress>,
}

pub fn create_router(handler: Arc<dyn ClassificationIngress>) -> Router {
    let state = IngressState { handler };

    Router::new()
        .route("/health", get(health_handler))
        .route("/classify/batch", post(classify_batch_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO)),
                )
                .layer(CorsLayer::permissive()),
        )
}

pub async fn start_server(bind: &str, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(bind = %bind, "ingress listening");
    axum::serve(listener, router)
        .await
        .map_err(|e| IndicatorOpsError::internal(format!("server error: {e}")))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy"}))
}

async fn classify_batch_handler(
    State(state): State<IngressState>,
    Json(request): Json<ClassifyBatchRequest>,
) -> std::result::Result<Json<ClassifyBatchResponse>, AppError> {
    let response = state.handler.submit(request).await?;
    Ok(Json(response))
}

struct AppError(IndicatorOpsError);

impl From<IndicatorOpsError> for AppError {
    fn from(err: IndicatorOpsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            IndicatorOpsError::Validation { .. } => StatusCode::BAD_REQUEST,
            IndicatorOpsError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => {
                error!(error = %self.0, "ingress request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({"error": self.0.to_string()}));
        (status, body).into_response()
    }
}
