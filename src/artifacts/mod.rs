//! Loading of trained artifacts: model, scaler, label and category
//! vocabularies.
//!
//! Everything here runs once at startup. Any problem is an
//! [`ArtifactError`] and the process should not start serving.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::features::{VocabularyError, VocabularyLists};
use crate::model::{ModelArtifact, ScalerParams};

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const LABELS_FILE: &str = "labels.json";
pub const VOCABULARIES_FILE: &str = "vocabularies.json";

// Reference artifacts compiled into the binary.
const REFERENCE_MODEL_JSON: &str = include_str!("reference/model.json");
const REFERENCE_SCALER_JSON: &str = include_str!("reference/scaler.json");
const REFERENCE_LABELS_JSON: &str = include_str!("reference/labels.json");

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse artifact {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{artifact} has {actual} features, the schema has {expected}")]
    Dimension {
        artifact: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("model feature {position} is {found:?}, the schema expects {expected:?}")]
    FeatureOrder {
        position: usize,
        expected: &'static str,
        found: String,
    },
    #[error("label vocabulary has {labels} entries but the model predicts {classes} classes")]
    LabelCount { labels: usize, classes: usize },
    #[error("{artifact} is invalid: {reason}")]
    Invalid {
        artifact: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
}

/// Parsed but not yet validated artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub model: ModelArtifact,
    pub scaler: ScalerParams,
    pub labels: Option<Vec<String>>,
    pub vocabularies: VocabularyLists,
    /// Where the set came from, for logs.
    pub source: String,
}

impl ArtifactSet {
    /// The reference set compiled into the binary.
    pub fn reference() -> Result<Self, ArtifactError> {
        Ok(Self {
            model: parse_embedded(MODEL_FILE, REFERENCE_MODEL_JSON)?,
            scaler: parse_embedded(SCALER_FILE, REFERENCE_SCALER_JSON)?,
            labels: Some(parse_embedded(LABELS_FILE, REFERENCE_LABELS_JSON)?),
            vocabularies: VocabularyLists::default(),
            source: "<embedded>".to_string(),
        })
    }

    /// Load a set from `dir`. Model and scaler are required; labels and
    /// vocabularies are optional.
    pub fn load_dir(dir: &Path) -> Result<Self, ArtifactError> {
        info!(dir = %dir.display(), "Loading model artifacts");

        let model = read_json(&dir.join(MODEL_FILE))?;
        let scaler = read_json(&dir.join(SCALER_FILE))?;

        let labels = read_optional_json(&dir.join(LABELS_FILE))?;
        if labels.is_none() {
            info!("No label vocabulary found, class ids resolve with the binary fallback");
        }

        let vocabularies = match read_optional_json(&dir.join(VOCABULARIES_FILE))? {
            Some(lists) => lists,
            None => {
                debug!("No vocabulary artifact, using built-in tables");
                VocabularyLists::default()
            }
        };

        Ok(Self {
            model,
            scaler,
            labels,
            vocabularies,
            source: dir.display().to_string(),
        })
    }

    /// Load from `dir` when given, otherwise the reference set.
    pub fn load(dir: Option<&Path>) -> Result<Self, ArtifactError> {
        match dir {
            Some(dir) => Self::load_dir(dir),
            None => {
                info!("No artifact directory configured, using embedded reference model");
                Self::reference()
            }
        }
    }
}

fn parse_embedded<T: DeserializeOwned>(name: &str, json: &str) -> Result<T, ArtifactError> {
    serde_json::from_str(json).map_err(|source| ArtifactError::Parse {
        path: Path::new("<embedded>").join(name),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ArtifactError> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}
