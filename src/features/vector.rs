//! Fixed-length feature vectors and the assembler that fills them.

use serde::Serialize;

use super::encoder::EncodedFields;
use super::schema::{feature_index, FeatureSpec, FEATURE_COUNT, FEATURE_SCHEMA};

/// Raw (unscaled) model input, one value per schema position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn zeroed() -> Self {
        Self([0.0; FEATURE_COUNT])
    }

    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        feature_index(name).and_then(|i| self.get(i))
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Named values for structured logging.
    pub fn to_log_entry(&self) -> serde_json::Value {
        let named: serde_json::Map<String, serde_json::Value> = FEATURE_SCHEMA
            .iter()
            .zip(self.0.iter())
            .map(|(f, v)| (f.name.to_string(), serde_json::json!(v)))
            .collect();
        serde_json::Value::Object(named)
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Model input after the scaler has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScaledFeatureVector([f64; FEATURE_COUNT]);

impl ScaledFeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Place each encoded value at its schema position.
///
/// Pure placement, no validation. Slots without a value keep 0.0, and
/// names the schema does not declare are ignored.
pub fn assemble(fields: &EncodedFields, schema: &[FeatureSpec]) -> FeatureVector {
    let mut vector = FeatureVector::zeroed();
    for (name, value) in fields.iter() {
        if let Some(spec) = schema.iter().find(|f| f.name == name) {
            if let Some(slot) = vector.0.get_mut(spec.position) {
                *slot = value;
            }
        }
    }
    vector
}
