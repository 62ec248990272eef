//! The model bundle: classifier plus the category lists it was fit with.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::encoding::{CategoryVocabulary, FeatureEncoder, FeatureRow, FEATURE_COUNT, FEATURE_NAMES};
use crate::model::{Model, ModelDump, ModelError};
use crate::types::FlightInformation;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid bundle JSON")]
    Parse(#[from] serde_json::Error),
    #[error("invalid classifier")]
    Model(#[from] ModelError),
    #[error("duplicate category {value:?} in {field}")]
    DuplicateCategory { field: &'static str, value: String },
    #[error("too many categories in {field}")]
    TooManyCategories { field: &'static str },
    #[error("{field} categories differ from the ones the classifier was fit with")]
    VocabularyMismatch { field: &'static str },
    #[error("classifier recorded {found} categorical columns, expected {expected}")]
    TrainingCategoryCount { found: usize, expected: usize },
    #[error("classifier reads {found} features, requests carry {expected}")]
    FeatureCount { found: usize, expected: usize },
    #[error("classifier feature names {found:?} do not match request columns {expected:?}")]
    FeatureNames { found: Vec<String>, expected: [&'static str; FEATURE_COUNT] },
}

#[derive(Deserialize)]
struct BundleFile {
    trained_model: ModelDump,
    #[serde(flatten)]
    vocabulary: CategoryVocabulary,
    #[serde(default)]
    model_version: Option<f64>,
}

/// Everything needed to score a flight. Read-only after load.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    model: Model,
    encoder: FeatureEncoder,
    version: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Prediction {
    pub delay_proba: f64,
    pub row: FeatureRow,
}

impl ModelBundle {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| BundleError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, BundleError> {
        let file: BundleFile = serde_json::from_str(text)?;
        let model = Model::from_dump(file.trained_model)?;

        if model.num_features() != FEATURE_COUNT {
            return Err(BundleError::FeatureCount {
                found: model.num_features(),
                expected: FEATURE_COUNT,
            });
        }
        let names = model.feature_names();
        if !names.is_empty() && names.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(BundleError::FeatureNames {
                found: names.to_vec(),
                expected: FEATURE_NAMES,
            });
        }

        let encoder = FeatureEncoder::from_vocabulary(file.vocabulary)?;
        if let Some(training) = model.training_categories() {
            encoder.check_training_categories(training)?;
        }
        Ok(Self { model, encoder, version: file.model_version })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Version recorded in the bundle, if any.
    pub fn version(&self) -> Option<f64> {
        self.version
    }

    /// Probability that `flight` is delayed.
    pub fn predict(&self, flight: &FlightInformation) -> Result<Prediction, ModelError> {
        let row = self.encoder.encode(flight);
        let [_, delayed] = self.model.class_probabilities(&row.values)?;
        Ok(Prediction { delay_proba: delayed, row })
    }
}
