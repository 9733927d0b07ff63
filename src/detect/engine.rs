use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactError, ArtifactSet};
use crate::detect::{DetectorSummary, PredictError, PredictionResult};
use crate::features::schema::feature_name;
use crate::features::{
    self, FeatureVector, RawInput, ScaledFeatureVector, ValidationError, Vocabularies,
    FEATURE_COUNT, FEATURE_SCHEMA,
};
use crate::model::{resolver, Classifier, LabelStrategy, Scaler};

/// Immutable inference context: vocabularies, scaler, classifier and
/// label strategy, loaded once and shared by every request.
pub struct Detector {
    vocabularies: Vocabularies,
    scaler: Scaler,
    classifier: Box<dyn Classifier>,
    labels: LabelStrategy,
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("classifier", &self.classifier.kind())
            .field("classes", &self.classifier.n_classes())
            .field("labels", &self.labels.name())
            .finish()
    }
}

impl Detector {
    /// Assemble a detector, checking that the pieces agree with the schema
    /// and with each other.
    pub fn new(
        vocabularies: Vocabularies,
        scaler: Scaler,
        classifier: Box<dyn Classifier>,
        labels: LabelStrategy,
    ) -> Result<Self, ArtifactError> {
        if classifier.n_features() != FEATURE_COUNT {
            return Err(ArtifactError::Dimension {
                artifact: "model",
                expected: FEATURE_COUNT,
                actual: classifier.n_features(),
            });
        }
        if let Some(count) = labels.class_count() {
            if count != classifier.n_classes() {
                return Err(ArtifactError::LabelCount {
                    labels: count,
                    classes: classifier.n_classes(),
                });
            }
        }

        Ok(Self {
            vocabularies,
            scaler,
            classifier,
            labels,
        })
    }

    /// Validate a parsed artifact set and build the detector from it.
    pub fn from_artifacts(set: ArtifactSet) -> Result<Self, ArtifactError> {
        let vocabularies = Vocabularies::from_lists(set.vocabularies)?;
        let scaler = Scaler::new(set.scaler)?;
        let classifier = set.model.into_classifier()?;
        let labels = LabelStrategy::from_labels(set.labels)?;

        let detector = Self::new(vocabularies, scaler, classifier, labels)?;
        info!(
            source = %set.source,
            model = detector.classifier.kind(),
            classes = detector.classifier.n_classes(),
            labels = detector.labels.name(),
            "Detector ready"
        );
        Ok(detector)
    }

    /// Validate and encode a record into the raw model input.
    pub fn encode(&self, input: &RawInput) -> Result<FeatureVector, ValidationError> {
        let fields = features::encode(input, &self.vocabularies)?;
        Ok(features::assemble(&fields, &FEATURE_SCHEMA))
    }

    /// Run the full pipeline on one record.
    pub fn predict(&self, input: &RawInput) -> Result<PredictionResult, PredictError> {
        let raw = self.encode(input).map_err(|e| {
            debug!(field = e.field(), error = %e, "Rejected input");
            e
        })?;
        debug!(features = %raw.to_log_entry(), "Encoded features");

        let scaled = self.scaler.transform(&raw);
        debug!(scaled = ?scaled.as_slice(), "Scaled features");
        if let Some(e) = overflowed(&scaled, input) {
            debug!(field = e.field(), error = %e, "Scaled value is not finite");
            return Err(e.into());
        }

        let classification = self.classifier.classify(&scaled).map_err(|e| {
            warn!(model = self.classifier.kind(), error = %e, "Model prediction failed");
            e
        })?;
        debug!(
            class_id = classification.class_id,
            probabilities = ?classification.probabilities,
            "Model output"
        );

        let result = resolver::resolve(classification, &self.labels)?;
        info!(label = %result.label, confidence = result.confidence, "Prediction");
        Ok(result)
    }

    pub fn vocabularies(&self) -> &Vocabularies {
        &self.vocabularies
    }

    pub fn labels(&self) -> &LabelStrategy {
        &self.labels
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn model_kind(&self) -> &'static str {
        self.classifier.kind()
    }

    pub fn describe(&self) -> DetectorSummary {
        DetectorSummary {
            features: FEATURE_SCHEMA.to_vec(),
            vocabularies: self.vocabularies.to_lists(),
            model: self.classifier.kind(),
            classes: self.classifier.n_classes(),
            label_strategy: self.labels.name(),
            labels: match &self.labels {
                LabelStrategy::Vocabulary(vocab) => Some(vocab.labels().to_vec()),
                LabelStrategy::BinaryFallback => None,
            },
        }
    }
}

/// A finite input that scales to infinity is reported against its field.
fn overflowed(scaled: &ScaledFeatureVector, input: &RawInput) -> Option<ValidationError> {
    let index = scaled.as_slice().iter().position(|v| !v.is_finite())?;
    let field = feature_name(index)?;
    Some(ValidationError::InvalidNumber {
        field,
        value: input.get(field).unwrap_or_default().to_string(),
    })
}
