//! Field validation and encoding.
//!
//! Fields are checked in a fixed order: protocol_type, service, flag,
//! logged_in, then the numeric fields in schema order. The first failure
//! ends the request.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::schema::{features_of_kind, FeatureKind, FLAG, LOGGED_IN, PROTOCOL_TYPE, SERVICE};
use super::vocab::{Vocabularies, Vocabulary};
use super::ValidationError;

/// Values that turn `logged_in` off. Compared case-insensitively.
const LOGGED_IN_FALSE: &[&str] = &["no", "0", "false"];

/// Submitted field values, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput(BTreeMap<String, String>);

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<HashMap<String, String>> for RawInput {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map.into_iter().collect())
    }
}

/// Validated scalar values keyed by feature name, in validation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedFields {
    values: Vec<(&'static str, f64)>,
}

impl EncodedFields {
    pub fn push(&mut self, name: &'static str, value: f64) {
        self.values.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Validate every field of `input` and encode it to a number.
pub fn encode(
    input: &RawInput,
    vocabularies: &Vocabularies,
) -> Result<EncodedFields, ValidationError> {
    let mut fields = EncodedFields::default();

    fields.push(PROTOCOL_TYPE, encode_category(input, PROTOCOL_TYPE, &vocabularies.protocol_type)?);
    fields.push(SERVICE, encode_category(input, SERVICE, &vocabularies.service)?);
    fields.push(FLAG, encode_category(input, FLAG, &vocabularies.flag)?);

    // An absent logged_in keeps the assembler's zero.
    if let Some(value) = input.get(LOGGED_IN) {
        fields.push(LOGGED_IN, encode_logged_in(value));
    }

    for spec in features_of_kind(FeatureKind::Numeric) {
        let raw = input.get(spec.name).unwrap_or("0");
        fields.push(spec.name, parse_number(spec.name, raw)?);
    }

    Ok(fields)
}

fn encode_category(
    input: &RawInput,
    field: &'static str,
    vocabulary: &Vocabulary,
) -> Result<f64, ValidationError> {
    let value = input
        .get(field)
        .ok_or(ValidationError::MissingField { field })?;

    vocabulary
        .encode(value)
        .map(|index| index as f64)
        .ok_or_else(|| ValidationError::UnknownCategory {
            field,
            value: value.to_string(),
        })
}

/// `"no"`, `"0"` and `"false"` (any case) are 0.0; anything else is 1.0.
pub fn encode_logged_in(value: &str) -> f64 {
    let folded = value.trim().to_lowercase();
    if LOGGED_IN_FALSE.contains(&folded.as_str()) {
        0.0
    } else {
        1.0
    }
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}
