//! Pre-trained model adapters: scaler, classifiers and label resolution.

pub mod logistic;
pub mod resolver;
pub mod scaler;
pub mod trees;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifacts::ArtifactError;
use crate::features::schema::first_mismatch;
use crate::features::ScaledFeatureVector;

pub use logistic::LogisticModel;
pub use resolver::LabelStrategy;
pub use scaler::{Scaler, ScalerParams};
pub use trees::TreeEnsemble;

/// Slack allowed when checking that probabilities sum to one.
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// The model failed to produce a usable prediction.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("classifier error: {0}")]
pub struct ClassifierError(pub String);

/// Predicted class and the full distribution it was picked from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub class_id: usize,
    pub probabilities: Vec<f64>,
}

/// A trained classifier over scaled feature vectors.
///
/// Implementations must be deterministic and free of interior mutation so
/// one instance can serve concurrent requests.
pub trait Classifier: Send + Sync {
    /// Short model family name for logs.
    fn kind(&self) -> &'static str;

    /// Input width the model was trained with.
    fn n_features(&self) -> usize;

    /// Number of classes in the output distribution.
    fn n_classes(&self) -> usize;

    /// Class probabilities in the model's fixed class order.
    fn predict_proba(&self, x: &ScaledFeatureVector) -> Result<Vec<f64>, ClassifierError>;

    /// Run the model and pick the most probable class.
    fn classify(&self, x: &ScaledFeatureVector) -> Result<Classification, ClassifierError> {
        let probabilities = self.predict_proba(x)?;
        check_distribution(&probabilities, self.n_classes())?;
        let class_id = argmax(&probabilities)
            .ok_or_else(|| ClassifierError("empty probability vector".to_string()))?;
        Ok(Classification {
            class_id,
            probabilities,
        })
    }
}

/// Index of the largest value; the first one wins on ties.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

fn check_distribution(probabilities: &[f64], n_classes: usize) -> Result<(), ClassifierError> {
    if probabilities.len() != n_classes {
        return Err(ClassifierError(format!(
            "model returned {} probabilities for {} classes",
            probabilities.len(),
            n_classes
        )));
    }
    if let Some(p) = probabilities
        .iter()
        .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
    {
        return Err(ClassifierError(format!("probability {} outside [0, 1]", p)));
    }
    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(ClassifierError(format!("probabilities sum to {}", sum)));
    }
    Ok(())
}

/// Model artifact as stored on disk, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Logistic(LogisticModel),
    TreeEnsemble(TreeEnsemble),
}

impl ModelArtifact {
    fn feature_names(&self) -> &[String] {
        match self {
            ModelArtifact::Logistic(m) => &m.feature_names,
            ModelArtifact::TreeEnsemble(m) => &m.feature_names,
        }
    }

    /// Validate the artifact and box it behind the [`Classifier`] seam.
    pub fn into_classifier(self) -> Result<Box<dyn Classifier>, ArtifactError> {
        let names = self.feature_names();
        if !names.is_empty() {
            if let Some((position, expected, found)) = first_mismatch(names) {
                return Err(ArtifactError::FeatureOrder {
                    position,
                    expected,
                    found,
                });
            }
        }

        match self {
            ModelArtifact::Logistic(m) => {
                m.validate()?;
                Ok(Box::new(m))
            }
            ModelArtifact::TreeEnsemble(m) => {
                m.validate()?;
                Ok(Box::new(m))
            }
        }
    }
}
