//! Turn a classification into a labelled result.

use super::{Classification, ClassifierError};
use crate::artifacts::ArtifactError;
use crate::detect::PredictionResult;
use crate::features::{CaseRule, Vocabulary};

pub const NORMAL: &str = "normal";
pub const ANOMALY: &str = "anomaly";

/// How class ids become labels. Chosen once when artifacts load.
#[derive(Debug, Clone)]
pub enum LabelStrategy {
    /// Decode through the class-label vocabulary.
    Vocabulary(Vocabulary),
    /// No label vocabulary: class 0 is "normal", every other id "anomaly".
    BinaryFallback,
}

impl LabelStrategy {
    pub fn from_labels(labels: Option<Vec<String>>) -> Result<Self, ArtifactError> {
        match labels {
            Some(labels) => Ok(LabelStrategy::Vocabulary(Vocabulary::new(
                "label",
                labels,
                CaseRule::Lower,
            )?)),
            None => Ok(LabelStrategy::BinaryFallback),
        }
    }

    pub fn label(&self, class_id: usize) -> Result<String, ClassifierError> {
        match self {
            LabelStrategy::Vocabulary(vocab) => vocab
                .decode(class_id)
                .map(str::to_string)
                .ok_or_else(|| {
                    ClassifierError(format!(
                        "class id {} outside label vocabulary of {}",
                        class_id,
                        vocab.len()
                    ))
                }),
            LabelStrategy::BinaryFallback => Ok(fallback_label(class_id).to_string()),
        }
    }

    /// Number of classes the strategy can name, if bounded.
    pub fn class_count(&self) -> Option<usize> {
        match self {
            LabelStrategy::Vocabulary(vocab) => Some(vocab.len()),
            LabelStrategy::BinaryFallback => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LabelStrategy::Vocabulary(_) => "vocabulary",
            LabelStrategy::BinaryFallback => "binary_fallback",
        }
    }
}

/// Only class 0 is normal.
pub fn fallback_label(class_id: usize) -> &'static str {
    if class_id == 0 {
        NORMAL
    } else {
        ANOMALY
    }
}

/// Highest class probability.
pub fn confidence(probabilities: &[f64]) -> f64 {
    probabilities.iter().copied().fold(0.0, f64::max)
}

pub fn resolve(
    classification: Classification,
    labels: &LabelStrategy,
) -> Result<PredictionResult, ClassifierError> {
    let label = labels.label(classification.class_id)?;
    Ok(PredictionResult {
        predicted_class_id: classification.class_id,
        confidence: confidence(&classification.probabilities),
        probabilities: classification.probabilities,
        label,
    })
}
