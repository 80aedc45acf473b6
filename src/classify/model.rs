//! Trained-model artifact: TF-IDF transform + linear classifier.
//!
//! The artifact is a JSON bundle exported from the offline training job:
//! ```json
//! {
//!   "labels": ["Roads", "Water"],
//!   "feature_names": ["pothole", "water", "water supply"],
//!   "vectorizer": { "idf": [1.4, 1.1, 1.9], "ngram_range": [1, 2],
//!                   "lowercase": true, "stop_words": "english",
//!                   "norm": "l2", "max_features": 500 },
//!   "classifier": { "coef": [[...], [...]], "intercept": [0.1, -0.1],
//!                   "multi_class": "multinomial" },
//!   "metadata": { "trained_at": "2025-01-30T10:00:00Z",
//!                 "model_type": "TF-IDF + Logistic Regression" }
//! }
//! ```
//! The vocabulary index of a term is its position in `feature_names`.
//!
//! Tokens use Unicode `\w`, which also matches combining marks (Devanagari
//! vowel signs and viramas). Python's `re` splits words at those marks, so a
//! vocabulary fitted on Indic-script text may not line up with the tokens
//! produced here. Artifacts trained on ASCII or Latin-script text match exactly.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::LoadError;

static STOP_WORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| include_str!("stop_words.txt").split_whitespace().collect());

// Same token pattern the vectorizer was fitted with: words of 2+ chars.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("token regex"));

/* ----------------------------
Artifact schema (from JSON)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub labels: Vec<String>,
    pub feature_names: Vec<String>,
    pub vectorizer: VectorizerState,
    pub classifier: ClassifierState,
    #[serde(default)]
    pub metadata: Option<ModelMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorizerState {
    pub idf: Vec<f32>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default = "default_true")]
    pub lowercase: bool,
    /// `"english"` or absent.
    #[serde(default)]
    pub stop_words: Option<String>,
    /// `"l2"`, `"l1"` or absent (no normalisation).
    #[serde(default = "default_norm")]
    pub norm: Option<String>,
    #[serde(default)]
    pub max_features: Option<usize>,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 2)
}
fn default_true() -> bool {
    true
}
fn default_norm() -> Option<String> {
    Some("l2".to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierState {
    pub coef: Vec<Vec<f32>>,
    pub intercept: Vec<f32>,
    #[serde(default)]
    pub multi_class: MultiClass,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiClass {
    #[default]
    Multinomial,
    Ovr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub model_type: Option<String>,
}

/* ----------------------------
Compiled model
---------------------------- */

#[derive(Debug)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    ngram_range: (usize, usize),
    lowercase: bool,
    drop_stop_words: bool,
    norm: Norm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Norm {
    L1,
    L2,
    None,
}

/// Sparse row: (feature index, weight), sorted by index.
pub type SparseRow = Vec<(usize, f32)>;

impl TfidfVectorizer {
    pub fn transform(&self, text: &str) -> SparseRow {
        let doc = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let tokens: Vec<&str> = TOKEN_RE
            .find_iter(&doc)
            .map(|m| m.as_str())
            .filter(|t| !(self.drop_stop_words && STOP_WORDS.contains(t)))
            .collect();

        // Raw term counts over all n-grams in range.
        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
        let (min_n, max_n) = self.ngram_range;
        for n in min_n.max(1)..=max_n {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                let gram = window.join(" ");
                if let Some(&idx) = self.vocabulary.get(&gram) {
                    *counts.entry(idx).or_insert(0.0) += 1.0;
                }
            }
        }

        let mut row: SparseRow = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        let denom = match self.norm {
            Norm::L2 => row.iter().map(|(_, v)| v * v).sum::<f32>().sqrt(),
            Norm::L1 => row.iter().map(|(_, v)| v.abs()).sum::<f32>(),
            Norm::None => 1.0,
        };
        if denom > 0.0 {
            for (_, v) in row.iter_mut() {
                *v /= denom;
            }
        }
        row
    }
}

#[derive(Debug)]
pub struct LinearClassifier {
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
    multi_class: MultiClass,
    n_labels: usize,
}

impl LinearClassifier {
    /// Per-label probabilities in label order, summing to 1. Logits accumulate
    /// in `f64`; `None` if any probability still comes out non-finite.
    pub fn predict_proba(&self, x: &SparseRow) -> Option<Vec<f32>> {
        let logits: Vec<f64> = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, &b)| {
                x.iter()
                    .map(|&(i, v)| f64::from(w[i]) * f64::from(v))
                    .sum::<f64>()
                    + f64::from(b)
            })
            .collect();

        // Binary artifacts carry a single decision row for the positive label.
        let probs = if self.coef.len() == 1 && self.n_labels == 2 {
            let p = sigmoid(logits[0]);
            vec![1.0 - p, p]
        } else {
            match self.multi_class {
                MultiClass::Multinomial => softmax(&logits),
                MultiClass::Ovr => {
                    let raw: Vec<f64> = logits.iter().map(|&z| sigmoid(z)).collect();
                    let sum: f64 = raw.iter().sum();
                    if sum > 0.0 {
                        raw.iter().map(|p| p / sum).collect()
                    } else {
                        vec![1.0 / self.n_labels as f64; self.n_labels]
                    }
                }
            }
        };

        if probs.iter().all(|p| p.is_finite()) {
            Some(probs.into_iter().map(|p| p as f32).collect())
        } else {
            None
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&z| (z - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

fn first_non_finite(a: &ModelArtifact) -> Option<&'static str> {
    if a.vectorizer.idf.iter().any(|v| !v.is_finite()) {
        return Some("idf");
    }
    if a.classifier.coef.iter().flatten().any(|v| !v.is_finite()) {
        return Some("coef");
    }
    if a.classifier.intercept.iter().any(|v| !v.is_finite()) {
        return Some("intercept");
    }
    None
}

/// Vectorizer + classifier + label set, validated against each other.
#[derive(Debug)]
pub struct TrainedModel {
    pub labels: Vec<String>,
    pub feature_names: Vec<String>,
    pub metadata: Option<ModelMetadata>,
    vectorizer: TfidfVectorizer,
    classifier: LinearClassifier,
}

impl TrainedModel {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let bytes = fs::read(path).map_err(|e| LoadError::from_io(path, e))?;
        let artifact: ModelArtifact =
            serde_json::from_slice(&bytes).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_artifact(artifact).map_err(|reason| LoadError::invalid(path, reason))
    }

    /// Validate shapes and compile. Returns a human-readable reason on mismatch.
    pub fn from_artifact(a: ModelArtifact) -> Result<Self, String> {
        let n_features = a.feature_names.len();
        let n_labels = a.labels.len();

        if n_labels < 2 {
            return Err(format!("expected at least 2 labels, got {n_labels}"));
        }
        if n_features == 0 {
            return Err("empty feature space".into());
        }
        if let Some(max) = a.vectorizer.max_features {
            if n_features > max {
                return Err(format!("{n_features} features exceed max_features={max}"));
            }
        }
        if a.vectorizer.idf.len() != n_features {
            return Err(format!(
                "idf has {} entries, feature_names has {n_features}",
                a.vectorizer.idf.len()
            ));
        }
        let (min_n, max_n) = a.vectorizer.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("bad ngram_range ({min_n}, {max_n})"));
        }

        let rows = a.classifier.coef.len();
        let rows_ok = rows == n_labels || (rows == 1 && n_labels == 2);
        if !rows_ok {
            return Err(format!("coef has {rows} rows for {n_labels} labels"));
        }
        if a.classifier.intercept.len() != rows {
            return Err(format!(
                "intercept has {} entries for {rows} coef rows",
                a.classifier.intercept.len()
            ));
        }
        if let Some(bad) = a.classifier.coef.iter().position(|r| r.len() != n_features) {
            return Err(format!("coef row {bad} does not span {n_features} features"));
        }
        if let Some(field) = first_non_finite(&a) {
            return Err(format!("{field} contains a non-finite value"));
        }

        let mut vocabulary = HashMap::with_capacity(n_features);
        for (i, term) in a.feature_names.iter().enumerate() {
            if vocabulary.insert(term.clone(), i).is_some() {
                return Err(format!("duplicate feature name `{term}`"));
            }
        }

        let drop_stop_words = match a.vectorizer.stop_words.as_deref() {
            None => false,
            Some(s) if s.eq_ignore_ascii_case("english") => true,
            Some(other) => return Err(format!("unsupported stop_words `{other}`")),
        };
        let norm = match a.vectorizer.norm.as_deref() {
            None => Norm::None,
            Some("l2") => Norm::L2,
            Some("l1") => Norm::L1,
            Some(other) => return Err(format!("unsupported norm `{other}`")),
        };

        Ok(Self {
            labels: a.labels,
            feature_names: a.feature_names,
            metadata: a.metadata,
            vectorizer: TfidfVectorizer {
                vocabulary,
                idf: a.vectorizer.idf,
                ngram_range: a.vectorizer.ngram_range,
                lowercase: a.vectorizer.lowercase,
                drop_stop_words,
                norm,
            },
            classifier: LinearClassifier {
                coef: a.classifier.coef,
                intercept: a.classifier.intercept,
                multi_class: a.classifier.multi_class,
                n_labels,
            },
        })
    }

    /// Returns (arg-max label, its probability, full mapping).
    /// Ties go to the first label in artifact order. Numerically unusable
    /// output becomes a uniform distribution.
    pub fn predict(&self, text: &str) -> (String, f32, BTreeMap<String, f32>) {
        let x = self.vectorizer.transform(text);
        let n = self.labels.len();
        let probs = self.classifier.predict_proba(&x).unwrap_or_else(|| {
            warn!(labels = n, "non-finite model output, using uniform probabilities");
            vec![1.0 / n as f32; n]
        });

        let mut best = 0usize;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = i;
            }
        }

        let mapping = self
            .labels
            .iter()
            .cloned()
            .zip(probs.iter().copied())
            .collect();
        (self.labels[best].clone(), probs[best], mapping)
    }

    /// Highest-weighted features per label, strongest first.
    pub fn top_features(&self, n: usize) -> BTreeMap<String, Vec<(String, f32)>> {
        let mut out = BTreeMap::new();
        let c = &self.classifier;
        for (li, label) in self.labels.iter().enumerate() {
            // Binary single-row artifacts: the row scores the second label, its
            // negation the first.
            let (row, sign) = if c.coef.len() == 1 {
                (&c.coef[0], if li == 0 { -1.0 } else { 1.0 })
            } else {
                (&c.coef[li], 1.0)
            };
            let mut ranked: Vec<(usize, f32)> =
                row.iter().enumerate().map(|(i, w)| (i, w * sign)).collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            let top = ranked
                .into_iter()
                .take(n)
                .map(|(i, w)| (self.feature_names[i].clone(), w))
                .collect();
            out.insert(label.clone(), top);
        }
        out
    }
}
