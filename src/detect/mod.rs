//! Connection classification -- the inference pipeline and its results.

pub mod engine;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::{FeatureSpec, ValidationError, VocabularyLists};
use crate::model::ClassifierError;

pub use engine::Detector;

/// Why a single prediction failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    /// The submitted record is invalid; the caller can fix and resubmit.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The model could not produce a prediction.
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Outcome of classifying one connection record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_class_id: usize,
    /// One entry per class, in the model's class order.
    pub probabilities: Vec<f64>,
    /// Largest entry of `probabilities`.
    pub confidence: f64,
    pub label: String,
}

/// What a loaded detector expects and produces.
#[derive(Debug, Clone, Serialize)]
pub struct DetectorSummary {
    pub features: Vec<FeatureSpec>,
    pub vocabularies: VocabularyLists,
    pub model: &'static str,
    pub classes: usize,
    pub label_strategy: &'static str,
    /// Class labels in class-id order; absent under the binary fallback.
    pub labels: Option<Vec<String>>,
}
