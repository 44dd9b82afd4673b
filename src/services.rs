//! Per-request risk evaluation.
//!
//! A [`DiseasePipeline`] bundles the three steps every disease goes through
//! (assemble, predict, advise). [`RiskService`] picks the pipeline for a
//! disease and applies the configured [`InputMode`] to coercion issues.

use crate::advice::AdvisoryTable;
use crate::config::InputMode;
use crate::disease::{Disease, Outcome};
use crate::errors::AppError;
use crate::features::{self, Assembled, FeatureVector};
use crate::handlers::AppState;
use crate::input::{FieldIssue, InputRecord};
use crate::models::{PredictionResponse, SuggestionsResponse};
use crate::registry::ModelRegistry;
use serde_json::Value;

/// Assemble / predict / advise for one disease.
#[derive(Clone, Copy)]
pub struct DiseasePipeline<'a> {
    disease: Disease,
    registry: &'a ModelRegistry,
    advice: &'a AdvisoryTable,
}

impl<'a> DiseasePipeline<'a> {
    pub fn assemble(&self, record: &InputRecord) -> Assembled {
        features::assemble(self.disease, record)
    }

    pub fn predict(&self, vector: &FeatureVector) -> Result<Outcome, AppError> {
        self.registry.predict(self.disease, vector)
    }

    pub fn tips(&self, outcome: Outcome) -> Vec<String> {
        self.advice
            .tips(self.disease, outcome)
            .iter()
            .map(|t| t.to_string())
            .collect()
    }
}

pub struct RiskService<'a> {
    registry: &'a ModelRegistry,
    advice: &'a AdvisoryTable,
    mode: InputMode,
}

impl<'a> RiskService<'a> {
    pub fn new(registry: &'a ModelRegistry, advice: &'a AdvisoryTable, mode: InputMode) -> Self {
        Self {
            registry,
            advice,
            mode,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(&state.registry, &state.advice, state.config.input_mode)
    }

    pub fn pipeline(&self, disease: Disease) -> DiseasePipeline<'a> {
        DiseasePipeline {
            disease,
            registry: self.registry,
            advice: self.advice,
        }
    }

    /// Scores a raw JSON body for `disease`.
    ///
    /// In permissive mode the only possible error is an internal one; strict
    /// mode additionally rejects non-object bodies and unusable field values.
    pub fn evaluate(&self, disease: Disease, body: Value) -> Result<PredictionResponse, AppError> {
        let record = match InputRecord::from_json(body) {
            Some(record) => record,
            None if self.mode == InputMode::Strict => {
                return Err(AppError::InvalidInput(vec![FieldIssue {
                    field: "body".to_string(),
                    reason: "expected a JSON object".to_string(),
                }]));
            }
            None => {
                tracing::warn!("{} request body is not a JSON object; using defaults", disease);
                InputRecord::new()
            }
        };

        let pipeline = self.pipeline(disease);
        let assembled = pipeline.assemble(&record);

        if !assembled.issues.is_empty() {
            match self.mode {
                InputMode::Strict => return Err(AppError::InvalidInput(assembled.issues)),
                InputMode::Permissive => {
                    for issue in &assembled.issues {
                        tracing::warn!(
                            "{}: defaulted field '{}' ({})",
                            disease,
                            issue.field,
                            issue.reason
                        );
                    }
                }
            }
        }

        let outcome = pipeline.predict(&assembled.vector)?;
        tracing::info!(
            "{} prediction: {} ({} input fields, {} features)",
            disease,
            outcome.code(),
            record.len(),
            assembled.vector.len()
        );

        Ok(PredictionResponse {
            prediction: outcome.code(),
            tips: pipeline.tips(outcome),
            disease: disease.display_name().to_string(),
        })
    }

    /// Suggestions for a disease name without a prediction. Missing or
    /// unknown names give an empty list.
    pub fn suggestions(&self, disease: Option<&str>) -> SuggestionsResponse {
        let name = disease.unwrap_or("general");
        SuggestionsResponse {
            tips: self.advice.general_tips(name),
        }
    }
}
