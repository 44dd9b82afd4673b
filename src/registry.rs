use crate::booster::BoostedTrees;
use crate::disease::{Disease, Outcome};
use crate::errors::AppError;
use crate::features::{feature_names, FeatureVector};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Anything that maps a feature vector to a binary class.
pub trait Classifier: Send + Sync {
    /// Number of inputs the classifier was trained on.
    fn num_features(&self) -> usize;

    fn predict(&self, features: &FeatureVector) -> Outcome;
}

impl Classifier for BoostedTrees {
    fn num_features(&self) -> usize {
        BoostedTrees::num_features(self)
    }

    fn predict(&self, features: &FeatureVector) -> Outcome {
        match self.predict_class(features.as_slice()) {
            0 => Outcome::Low,
            _ => Outcome::Elevated,
        }
    }
}

/// A classifier together with where it came from.
#[derive(Clone)]
pub struct LoadedModel {
    pub disease: Disease,
    pub artifact: PathBuf,
    /// Hex SHA-256 of the artifact bytes.
    pub sha256: String,
    pub trees: usize,
    pub loaded_at: DateTime<Utc>,
    classifier: Arc<dyn Classifier>,
}

impl LoadedModel {
    /// Wraps an in-memory classifier. Used by tests and tools that do not
    /// read artifacts from disk.
    pub fn in_memory(disease: Disease, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            disease,
            artifact: PathBuf::new(),
            sha256: String::new(),
            trees: 0,
            loaded_at: Utc::now(),
            classifier,
        }
    }

    pub fn num_features(&self) -> usize {
        self.classifier.num_features()
    }
}

/// Artifact extensions tried for each disease, in order of preference.
pub const ARTIFACT_EXTENSIONS: [&str; 3] = ["json", "ubj", "xgb"];

/// Finds the artifact for `disease` in `model_dir`: the first of
/// `<stem>.json`, `<stem>.ubj`, `<stem>.xgb` that exists.
pub fn locate_artifact(model_dir: &Path, disease: Disease) -> anyhow::Result<PathBuf> {
    let candidates: Vec<PathBuf> = ARTIFACT_EXTENSIONS
        .iter()
        .map(|ext| model_dir.join(format!("{}.{}", disease.artifact_stem(), ext)))
        .collect();
    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => Ok(path.clone()),
        None => {
            let tried: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
            anyhow::bail!("no {} model artifact found (tried {})", disease, tried.join(", "))
        }
    }
}

/// Reads and parses one artifact (JSON or UBJSON), recording its fingerprint.
pub fn load_artifact(path: &Path) -> anyhow::Result<(BoostedTrees, String)> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read model artifact {}", path.display()))?;
    let model = BoostedTrees::from_slice(&bytes)
        .with_context(|| format!("failed to parse model artifact {}", path.display()))?;
    Ok((model, fingerprint(&bytes)))
}

/// Hex-encoded SHA-256 of an artifact.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// The five disease classifiers, loaded once at startup and read-only after.
#[derive(Clone)]
pub struct ModelRegistry {
    models: BTreeMap<Disease, LoadedModel>,
}

impl ModelRegistry {
    /// Loads `<model_dir>/<stem>.{json,ubj,xgb}` for every disease.
    ///
    /// Any missing, malformed or mis-shaped artifact fails the whole load;
    /// the service must never run with a partial registry.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let mut models = Vec::with_capacity(Disease::ALL.len());
        for disease in Disease::ALL {
            let path = locate_artifact(model_dir, disease)?;
            let (booster, sha256) = load_artifact(&path)?;
            let names = booster.feature_names();
            let expected = feature_names(disease).iter().copied();
            if !names.is_empty() && names.iter().map(String::as_str).ne(expected) {
                tracing::debug!(
                    "{} model was trained with columns {:?}; inputs are mapped by position",
                    disease,
                    names
                );
            }
            tracing::info!(
                "✓ Loaded {} model from {} ({} trees, {} features, sha256 {}…)",
                disease,
                path.display(),
                booster.num_trees(),
                booster.num_features(),
                &sha256[..12]
            );
            models.push(LoadedModel {
                disease,
                artifact: path,
                sha256,
                trees: booster.num_trees(),
                loaded_at: Utc::now(),
                classifier: Arc::new(booster),
            });
        }
        Self::from_models(models)
    }

    /// Builds a registry from already-loaded models, enforcing that every
    /// disease is present exactly once with a matching input width.
    pub fn from_models(models: impl IntoIterator<Item = LoadedModel>) -> anyhow::Result<Self> {
        let mut map = BTreeMap::new();
        for model in models {
            let expected = feature_names(model.disease).len();
            if model.num_features() != expected {
                anyhow::bail!(
                    "{} model expects {} features but the {} schema has {}",
                    model.disease,
                    model.num_features(),
                    model.disease,
                    expected
                );
            }
            let disease = model.disease;
            if map.insert(disease, model).is_some() {
                anyhow::bail!("{} model supplied twice", disease);
            }
        }
        if let Some(missing) = Disease::ALL.iter().find(|d| !map.contains_key(*d)) {
            anyhow::bail!("no model loaded for {}", missing);
        }
        Ok(Self { models: map })
    }

    pub fn predict(&self, disease: Disease, features: &FeatureVector) -> Result<Outcome, AppError> {
        let model = self
            .models
            .get(&disease)
            .ok_or_else(|| AppError::InternalError(format!("no model for {}", disease)))?;
        if features.len() != model.num_features() {
            return Err(AppError::InternalError(format!(
                "{} model expects {} features, got {}",
                disease,
                model.num_features(),
                features.len()
            )));
        }
        Ok(model.classifier.predict(features))
    }

    /// Loaded models in disease order.
    pub fn models(&self) -> impl Iterator<Item = &LoadedModel> {
        self.models.values()
    }
}
