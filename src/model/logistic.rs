use serde::{Deserialize, Serialize};

use super::{Classifier, ClassifierError};
use crate::artifacts::ArtifactError;
use crate::features::{ScaledFeatureVector, FEATURE_COUNT};

/// Linear classifier (logistic regression).
///
/// A single weight row is a binary model scoring class 1 with a sigmoid;
/// two or more rows are a multinomial model with a softmax over rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub weights: Vec<Vec<f64>>, // [n_rows][n_features]
    pub bias: Vec<f64>,         // [n_rows]
}

impl LogisticModel {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.weights.is_empty() {
            return Err(ArtifactError::Invalid {
                artifact: "logistic model",
                reason: "no weight rows".to_string(),
            });
        }
        if self.bias.len() != self.weights.len() {
            return Err(ArtifactError::Invalid {
                artifact: "logistic model",
                reason: format!(
                    "{} bias terms for {} weight rows",
                    self.bias.len(),
                    self.weights.len()
                ),
            });
        }
        for row in &self.weights {
            if row.len() != FEATURE_COUNT {
                return Err(ArtifactError::Dimension {
                    artifact: "logistic model",
                    expected: FEATURE_COUNT,
                    actual: row.len(),
                });
            }
        }
        let all_finite = self
            .weights
            .iter()
            .flatten()
            .chain(self.bias.iter())
            .all(|w| w.is_finite());
        if !all_finite {
            return Err(ArtifactError::Invalid {
                artifact: "logistic model",
                reason: "non-finite coefficient".to_string(),
            });
        }
        Ok(())
    }

    fn scores(&self, x: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        let mut scores = Vec::with_capacity(self.weights.len());
        for (k, row) in self.weights.iter().enumerate() {
            if row.len() != x.len() {
                return Err(ClassifierError(format!(
                    "weight row {} has {} entries, input has {}",
                    k,
                    row.len(),
                    x.len()
                )));
            }
            let dot: f64 = row.iter().zip(x).map(|(w, v)| w * v).sum();
            let bias = self.bias.get(k).copied().unwrap_or(0.0);
            scores.push(dot + bias);
        }
        Ok(scores)
    }
}

impl Classifier for LogisticModel {
    fn kind(&self) -> &'static str {
        "logistic"
    }

    fn n_features(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    fn n_classes(&self) -> usize {
        match self.weights.len() {
            1 => 2,
            n => n,
        }
    }

    fn predict_proba(&self, x: &ScaledFeatureVector) -> Result<Vec<f64>, ClassifierError> {
        let scores = self.scores(x.as_slice())?;

        if let [score] = scores.as_slice() {
            let p = sigmoid(*score);
            return Ok(vec![1.0 - p, p]);
        }

        Ok(softmax(&scores))
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Softmax shifted by the max score so large scores cannot overflow.
fn softmax(scores: &[f64]) -> Vec<f64> {
    let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max_score).exp()).collect();
    let sum_exp: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum_exp).collect()
}
