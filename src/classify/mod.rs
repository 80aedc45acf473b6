// src/classify/mod.rs
//! Category classifier: trained TF-IDF model when available, keyword rules otherwise.
//!
//! The mode is fixed when the classifier is built. A missing or broken artifact
//! never fails construction; the classifier degrades to rule mode and reports why
//! through [`Availability`].

pub mod model;
pub mod rules;

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::Availability;
use model::TrainedModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    Model,
    Rules,
}

impl ClassifierMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Rules => "rules",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub category: String,
    /// Probability of `category`, in [0,1].
    pub confidence: f32,
    /// Full label → probability mapping (model mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<BTreeMap<String, f32>>,
    pub mode: ClassifierMode,
}

#[derive(Debug)]
pub struct CategoryClassifier {
    model: Option<TrainedModel>,
}

impl CategoryClassifier {
    /// Rule-mode classifier, no artifact involved.
    pub fn rules_only() -> Self {
        Self { model: None }
    }

    pub fn with_model(model: TrainedModel) -> Self {
        Self { model: Some(model) }
    }

    /// Load the artifact at `path`, falling back to rule mode on any failure.
    pub fn load(path: &Path) -> (Self, Availability) {
        match TrainedModel::load(path) {
            Ok(model) => {
                info!(
                    path = %path.display(),
                    labels = model.labels.len(),
                    features = model.feature_names.len(),
                    "classifier model loaded"
                );
                (Self::with_model(model), Availability::Ready)
            }
            Err(err) => {
                warn!(error = %err, "classifier model unavailable, using keyword rules");
                (Self::rules_only(), Availability::degraded(&err))
            }
        }
    }

    pub fn mode(&self) -> ClassifierMode {
        if self.model.is_some() {
            ClassifierMode::Model
        } else {
            ClassifierMode::Rules
        }
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_ref()
    }

    /// Total: returns a result for every input, including empty text.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        match &self.model {
            Some(m) => {
                let (category, confidence, probabilities) = m.predict(text);
                ClassificationResult {
                    category,
                    confidence: confidence.clamp(0.0, 1.0),
                    probabilities: Some(probabilities),
                    mode: ClassifierMode::Model,
                }
            }
            None => rules::classify_by_rules(text),
        }
    }
}
