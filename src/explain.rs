//! Per-dimension explanation attached to every triage record.
//!
//! One [`ExplanationEntry`] per dimension, each with a value (score or label),
//! a short note and the reasons collected by the component that produced it.

use serde::Serialize;

use crate::classify::{ClassificationResult, ClassifierMode};
use crate::priority::{PopulationEstimator, PriorityLevel, ScoreBreakdown, SubScore};
use crate::schemes::SchemeMatch;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntryValue {
    Score(f32),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationEntry {
    pub value: EntryValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub notes: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl ExplanationEntry {
    pub fn score(value: f32, notes: impl Into<String>) -> Self {
        Self {
            value: EntryValue::Score(value),
            confidence: None,
            notes: notes.into(),
            reasons: Vec::new(),
        }
    }

    pub fn label(value: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            value: EntryValue::Label(value.into()),
            confidence: None,
            notes: notes.into(),
            reasons: Vec::new(),
        }
    }

    pub fn with_confidence(mut self, c: f32) -> Self {
        self.confidence = Some(c);
        self
    }

    pub fn with_reasons(mut self, reasons: impl IntoIterator<Item = String>) -> Self {
        self.reasons.extend(reasons);
        self
    }

    fn from_sub(sub: &SubScore, notes: &str) -> Self {
        Self::score(sub.value, notes).with_reasons(sub.reasons.iter().cloned())
    }
}

/// Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub category: ExplanationEntry,
    pub urgency: ExplanationEntry,
    pub population_impact: ExplanationEntry,
    pub vulnerability: ExplanationEntry,
    pub priority_score: ExplanationEntry,
    pub scheme: ExplanationEntry,
}

impl Explanation {
    pub fn build(
        classification: &ClassificationResult,
        scores: &ScoreBreakdown,
        scheme: &SchemeMatch,
    ) -> Self {
        let category_note = match classification.mode {
            ClassifierMode::Model => "Predicted by the trained text classifier",
            ClassifierMode::Rules => "Keyword rules (no trained model loaded)",
        };

        let population_note = match scores.population_estimator {
            PopulationEstimator::HistoricalCount => {
                "Estimated from similar complaints in the same area"
            }
            PopulationEstimator::TextHeuristic => {
                "Estimated from scale phrases and headcounts in the text"
            }
        };

        let mut scheme_entry = ExplanationEntry::label(&scheme.scheme, &scheme.explanation);
        if !scheme.matched_keywords.is_empty() {
            scheme_entry = scheme_entry.with_reasons(
                scheme
                    .matched_keywords
                    .iter()
                    .map(|k| format!("keyword '{k}'")),
            );
        }

        Self {
            category: ExplanationEntry::label(&classification.category, category_note)
                .with_confidence(classification.confidence),
            urgency: ExplanationEntry::from_sub(&scores.urgency, "Urgency keywords and duration"),
            population_impact: ExplanationEntry::from_sub(
                &scores.population_impact,
                population_note,
            ),
            vulnerability: ExplanationEntry::from_sub(
                &scores.vulnerability,
                "Strongest vulnerable-group mention",
            ),
            priority_score: ExplanationEntry::score(
                scores.priority_score,
                format!("Weighted blend, profile '{}'", scores.profile),
            )
            .with_reasons([format!(
                "Level {}",
                level_label(scores.priority_level)
            )]),
            scheme: scheme_entry,
        }
    }
}

fn level_label(l: PriorityLevel) -> &'static str {
    match l {
        PriorityLevel::High => "HIGH",
        PriorityLevel::Medium => "MEDIUM",
        PriorityLevel::Low => "LOW",
    }
}
