// src/priority/mod.rs
//! Priority scorer: urgency, population impact and vulnerability sub-scores plus
//! classifier confidence, blended under a [`WeightProfile`].
//!
//! Every value in a [`ScoreBreakdown`] lies in [0,1]. The historical complaint
//! count is read through [`HistoricalCounts`] only when the active profile uses
//! the count-based population estimator.

pub mod profile;
pub mod signals;

use serde::Serialize;

use crate::history::HistoricalCounts;
pub use profile::{LevelThresholds, PopulationEstimator, ProfileName, WeightProfile, Weights};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriorityLevel {
    High,
    Medium,
    Low,
}

impl PriorityLevel {
    pub fn from_score(score: f32, t: &LevelThresholds) -> Self {
        if score >= t.high {
            Self::High
        } else if score >= t.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One sub-score with the reasons that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubScore {
    pub value: f32,
    pub reasons: Vec<String>,
}

impl SubScore {
    fn new(value: f32, reasons: Vec<String>, placeholder: &str) -> Self {
        let reasons = if reasons.is_empty() {
            vec![placeholder.to_string()]
        } else {
            reasons
        };
        Self {
            value: clamp01(value),
            reasons,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub urgency: SubScore,
    pub population_impact: SubScore,
    pub vulnerability: SubScore,
    pub confidence: f32,
    pub priority_score: f32,
    pub priority_level: PriorityLevel,
    pub profile: String,
    pub population_estimator: PopulationEstimator,
}

#[derive(Debug, Clone)]
pub struct PriorityScorer {
    profile: WeightProfile,
}

impl Default for PriorityScorer {
    fn default() -> Self {
        Self::new(WeightProfile::balanced())
    }
}

impl PriorityScorer {
    pub fn new(profile: WeightProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &WeightProfile {
        &self.profile
    }

    pub fn score(
        &self,
        text: &str,
        area: Option<&str>,
        category: Option<&str>,
        classifier_confidence: f32,
        counts: &dyn HistoricalCounts,
    ) -> ScoreBreakdown {
        let (u, u_reasons) = signals::urgency(text);
        let urgency = SubScore::new(u, u_reasons, "Base urgency applied");

        let population_impact = match self.profile.population {
            PopulationEstimator::TextHeuristic => {
                let (p, reasons) = signals::population_from_text(text);
                SubScore::new(p, reasons, "Single complaint")
            }
            PopulationEstimator::HistoricalCount => population_from_history(area, category, counts),
        };

        let (v, v_reasons) = signals::vulnerability(text);
        let vulnerability = SubScore::new(v, v_reasons, "No vulnerable groups");

        let confidence = if classifier_confidence.is_finite() {
            clamp01(classifier_confidence)
        } else {
            0.0
        };

        let w = &self.profile.weights;
        let raw = w.urgency * urgency.value
            + w.population * population_impact.value
            + w.vulnerability * vulnerability.value
            + w.confidence * confidence;
        let mut priority_score = clamp01(raw);
        if let Some(d) = self.profile.priority_decimals {
            priority_score = round_to(priority_score, d);
        }

        ScoreBreakdown {
            priority_level: PriorityLevel::from_score(priority_score, &self.profile.levels),
            urgency,
            population_impact,
            vulnerability,
            confidence,
            priority_score,
            profile: self.profile.name.clone(),
            population_estimator: self.profile.population,
        }
    }
}

fn population_from_history(
    area: Option<&str>,
    category: Option<&str>,
    counts: &dyn HistoricalCounts,
) -> SubScore {
    let area = area.map(str::trim).filter(|s| !s.is_empty());
    let category = category.map(str::trim).filter(|s| !s.is_empty());

    match (area, category) {
        (Some(a), Some(c)) => {
            let n = counts.count(a, c);
            let value = signals::population_from_count(n);
            let note = match n {
                0 => format!("No similar complaints in '{a}' for {c}"),
                1 => format!("1 similar complaint in '{a}' for {c}"),
                _ => format!("{n} similar complaints in '{a}' for {c}"),
            };
            SubScore::new(value, vec![note], "")
        }
        _ => SubScore::new(
            0.3,
            vec!["Area or category missing; flat estimate applied".into()],
            "",
        ),
    }
}

pub(crate) fn clamp01(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

pub(crate) fn round_to(x: f32, decimals: u32) -> f32 {
    let f = 10f32.powi(decimals as i32);
    (x * f).round() / f
}
