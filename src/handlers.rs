use crate::advice::AdvisoryTable;
use crate::config::Config;
use crate::disease::Disease;
use crate::errors::AppError;
use crate::models::*;
use crate::registry::ModelRegistry;
use crate::services::RiskService;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::sync::Arc;

/// Shared application state injected into handlers.
///
/// Everything here is immutable after startup.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Loaded classifiers for every disease.
    pub registry: ModelRegistry,
    /// Static advice lookup.
    pub advice: AdvisoryTable,
}

/// Health check endpoint.
///
/// Returns the service status, version, input mode and a summary of each
/// loaded model.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let models = state
        .registry
        .models()
        .map(|m| ModelSummary {
            disease: m.disease,
            artifact: m.artifact.display().to_string(),
            sha256: m.sha256.clone(),
            trees: m.trees,
            features: m.num_features(),
            loaded_at: m.loaded_at,
        })
        .collect();

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            input_mode: state.config.input_mode,
            models,
        }),
    )
}

/// POST /predict/:disease
///
/// Coerces the body into the disease's feature vector, runs its classifier
/// and returns the prediction with matching advice.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `disease` - Route segment naming the disease.
/// * `payload` - Loosely-typed JSON record.
///
/// # Returns
///
/// * `Result<Json<PredictionResponse>, AppError>` - The prediction, 404 for an
///   unknown disease, 400 when the body is not JSON, or 422 for rejected input
///   in strict mode.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Path(disease): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    tracing::info!("POST /predict/{}", disease);

    let disease: Disease = disease
        .parse()
        .map_err(|e: crate::disease::UnknownDisease| AppError::NotFound(e.to_string()))?;
    let Json(body) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let service = RiskService::from_state(&state);
    let response = service.evaluate(disease, body)?;

    Ok(Json(response))
}

/// GET /health-suggestions?disease=<name>
///
/// General advice for a disease when no prediction was made.
pub async fn health_suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestionsQuery>,
) -> Json<SuggestionsResponse> {
    tracing::info!("GET /health-suggestions - params: {:?}", params);

    let service = RiskService::from_state(&state);
    Json(service.suggestions(params.disease.as_deref()))
}
