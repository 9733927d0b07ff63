//! Feature schema -- the fixed 15-slot layout the model was trained on.
//!
//! Positions in [`FEATURE_SCHEMA`] are the indices of the input vector.
//! Reordering, adding or removing an entry invalidates every trained
//! artifact, so this table only changes together with a retrain.

use serde::Serialize;

pub const PROTOCOL_TYPE: &str = "protocol_type";
pub const SERVICE: &str = "service";
pub const FLAG: &str = "flag";
pub const LOGGED_IN: &str = "logged_in";

/// Number of features in the model input vector.
pub const FEATURE_COUNT: usize = 15;

/// How a raw field value is turned into a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Looked up in a vocabulary; the label index is the value.
    Categorical,
    /// Mapped to 0.0 or 1.0.
    Boolean,
    /// Parsed as a floating-point number.
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub kind: FeatureKind,
    pub position: usize,
}

const fn spec(name: &'static str, kind: FeatureKind, position: usize) -> FeatureSpec {
    FeatureSpec { name, kind, position }
}

/// Feature names, kinds and vector positions in model input order.
pub static FEATURE_SCHEMA: [FeatureSpec; FEATURE_COUNT] = [
    spec(PROTOCOL_TYPE, FeatureKind::Categorical, 0),
    spec(SERVICE, FeatureKind::Categorical, 1),
    spec(FLAG, FeatureKind::Categorical, 2),
    spec("src_bytes", FeatureKind::Numeric, 3),
    spec("dst_bytes", FeatureKind::Numeric, 4),
    spec(LOGGED_IN, FeatureKind::Boolean, 5),
    spec("count", FeatureKind::Numeric, 6),
    spec("srv_count", FeatureKind::Numeric, 7),
    spec("serror_rate", FeatureKind::Numeric, 8),
    spec("rerror_rate", FeatureKind::Numeric, 9),
    spec("srv_rerror_rate", FeatureKind::Numeric, 10),
    spec("same_srv_rate", FeatureKind::Numeric, 11),
    spec("diff_srv_rate", FeatureKind::Numeric, 12),
    spec("dst_host_srv_count", FeatureKind::Numeric, 13),
    spec("dst_host_serror_rate", FeatureKind::Numeric, 14),
];

/// Look up a feature's vector position by name.
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_SCHEMA
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.position)
}

pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_SCHEMA.get(index).map(|f| f.name)
}

/// Iterate the features of one kind, in schema order.
pub fn features_of_kind(kind: FeatureKind) -> impl Iterator<Item = &'static FeatureSpec> {
    FEATURE_SCHEMA.iter().filter(move |f| f.kind == kind)
}

/// Compare an artifact's declared feature order with the schema.
///
/// Returns the first position where they disagree, if any. A shorter or
/// longer list disagrees at the first missing or extra position.
pub fn first_mismatch(names: &[String]) -> Option<(usize, &'static str, String)> {
    for position in 0..FEATURE_COUNT.max(names.len()) {
        let expected = feature_name(position).unwrap_or("<none>");
        let found = names.get(position).map(String::as_str).unwrap_or("<none>");
        if expected != found {
            return Some((position, expected, found.to_string()));
        }
    }
    None
}
