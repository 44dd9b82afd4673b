use crate::config::InputMode;
use crate::disease::Disease;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ Prediction ============

/// Uniform body returned by every `/predict/<disease>` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// 0 (low risk) or 1 (elevated risk).
    pub prediction: u8,
    /// Advice for this exact outcome, in display order.
    pub tips: Vec<String>,
    /// Display name, e.g. "Cardiovascular Disease".
    pub disease: String,
}

// ============ Suggestions ============

/// Query parameters for `GET /health-suggestions`.
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionsQuery {
    pub disease: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub tips: Vec<String>,
}

// ============ Health ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub input_mode: InputMode,
    pub models: Vec<ModelSummary>,
}

/// What `/health` reports about each loaded classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub disease: Disease,
    pub artifact: String,
    pub sha256: String,
    pub trees: usize,
    pub features: usize,
    pub loaded_at: DateTime<Utc>,
}
