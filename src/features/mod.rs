//! Feature encoding -- vocabularies, the fixed schema, per-field
//! validation and vector assembly.

pub mod encoder;
pub mod schema;
pub mod vector;
pub mod vocab;

use thiserror::Error;

pub use encoder::{encode, EncodedFields, RawInput};
pub use schema::{FeatureKind, FeatureSpec, FEATURE_COUNT, FEATURE_SCHEMA};
pub use vector::{assemble, FeatureVector, ScaledFeatureVector};
pub use vocab::{CaseRule, Vocabularies, Vocabulary, VocabularyError, VocabularyLists};

/// A submitted field the pipeline cannot encode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field {field}")]
    MissingField { field: &'static str },
    #[error("invalid {field}: {value}")]
    UnknownCategory { field: &'static str, value: String },
    #[error("invalid value for {field}: {value:?} is not a valid number")]
    InvalidNumber { field: &'static str, value: String },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::UnknownCategory { field, .. }
            | ValidationError::InvalidNumber { field, .. } => *field,
        }
    }

    /// Submitted value, if there was one.
    pub fn value(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { .. } => None,
            ValidationError::UnknownCategory { value, .. }
            | ValidationError::InvalidNumber { value, .. } => Some(value.as_str()),
        }
    }

    /// Stable machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MissingField { .. } => "missing_field",
            ValidationError::UnknownCategory { .. } => "unknown_category",
            ValidationError::InvalidNumber { .. } => "invalid_number",
        }
    }
}
