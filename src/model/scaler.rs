//! Standardizing scaler fitted at training time.

use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactError;
use crate::features::{FeatureVector, ScaledFeatureVector, FEATURE_COUNT};

/// Scaler artifact: per-feature mean and scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Validated scaler; `scaled[i] = (raw[i] - mean[i]) / scale[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl Scaler {
    pub fn new(params: ScalerParams) -> Result<Self, ArtifactError> {
        let mean = fixed_width("scaler mean", &params.mean)?;
        let scale = fixed_width("scaler scale", &params.scale)?;

        if let Some(bad) = mean.iter().find(|m| !m.is_finite()) {
            return Err(ArtifactError::Invalid {
                artifact: "scaler",
                reason: format!("non-finite mean {}", bad),
            });
        }
        if let Some((i, bad)) = scale
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_finite() || **s == 0.0)
        {
            return Err(ArtifactError::Invalid {
                artifact: "scaler",
                reason: format!("scale[{}] = {} cannot divide", i, bad),
            });
        }

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, raw: &FeatureVector) -> ScaledFeatureVector {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, value) in raw.as_array().iter().enumerate() {
            out[i] = (value - self.mean[i]) / self.scale[i];
        }
        ScaledFeatureVector::from_values(out)
    }

    pub fn params(&self) -> ScalerParams {
        ScalerParams {
            mean: self.mean.to_vec(),
            scale: self.scale.to_vec(),
        }
    }
}

fn fixed_width(
    artifact: &'static str,
    values: &[f64],
) -> Result<[f64; FEATURE_COUNT], ArtifactError> {
    values.try_into().map_err(|_| ArtifactError::Dimension {
        artifact,
        expected: FEATURE_COUNT,
        actual: values.len(),
    })
}
