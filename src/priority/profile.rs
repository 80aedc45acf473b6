//! Named weighting profiles for the priority blend.
//!
//! Two presets ship with the crate:
//! - `balanced`: urgency 0.35, population 0.25, vulnerability 0.25, confidence 0.15,
//!   population taken from the historical complaint count;
//! - `impact`: urgency 0.40, population 0.35, vulnerability 0.25, no confidence
//!   term, population taken from text heuristics, priority rounded to 3 decimals.
//!
//! A TOML file can override either preset:
//! ```toml
//! base = "impact"
//! [weights]
//! urgency = 0.5
//! population = 0.3
//! vulnerability = 0.2
//! confidence = 0.0
//! [levels]
//! high = 0.75
//! medium = 0.5
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub urgency: f32,
    pub population: f32,
    pub vulnerability: f32,
    #[serde(default)]
    pub confidence: f32,
}

/// Which estimator feeds `population_impact` into the blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationEstimator {
    /// Bucketed count of prior complaints with the same (area, category).
    HistoricalCount,
    /// Phrase table plus headcount patterns in the complaint text.
    TextHeuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelThresholds {
    pub high: f32,
    pub medium: f32,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            high: 0.70,
            medium: 0.45,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightProfile {
    pub name: String,
    pub weights: Weights,
    pub population: PopulationEstimator,
    pub levels: LevelThresholds,
    /// Round the blended priority to this many decimals (None = keep full precision).
    pub priority_decimals: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileName {
    Balanced,
    Impact,
}

impl FromStr for ProfileName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "balanced" | "canonical" | "default" => Ok(Self::Balanced),
            "impact" | "alternate" => Ok(Self::Impact),
            other => Err(anyhow!("unknown priority profile `{other}`")),
        }
    }
}

impl WeightProfile {
    pub fn balanced() -> Self {
        Self {
            name: "balanced".into(),
            weights: Weights {
                urgency: 0.35,
                population: 0.25,
                vulnerability: 0.25,
                confidence: 0.15,
            },
            population: PopulationEstimator::HistoricalCount,
            levels: LevelThresholds::default(),
            priority_decimals: None,
        }
    }

    pub fn impact() -> Self {
        Self {
            name: "impact".into(),
            weights: Weights {
                urgency: 0.40,
                population: 0.35,
                vulnerability: 0.25,
                confidence: 0.0,
            },
            population: PopulationEstimator::TextHeuristic,
            levels: LevelThresholds::default(),
            priority_decimals: Some(3),
        }
    }

    pub fn preset(name: ProfileName) -> Self {
        match name {
            ProfileName::Balanced => Self::balanced(),
            ProfileName::Impact => Self::impact(),
        }
    }

    /// Load a TOML override file. Unset fields keep the values of the file's
    /// `base` preset, or of `default_base` when the file names none.
    pub fn from_toml_file(path: &Path, default_base: ProfileName) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading priority profile from {}", path.display()))?;
        Self::overlay_toml_str(default_base, &content)
            .with_context(|| format!("parsing priority profile {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Self::overlay_toml_str(ProfileName::Balanced, s)
    }

    pub fn overlay_toml_str(default_base: ProfileName, s: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct ProfileFile {
            #[serde(default)]
            base: Option<String>,
            #[serde(default)]
            name: Option<String>,
            #[serde(default)]
            weights: Option<Weights>,
            #[serde(default)]
            population: Option<PopulationEstimator>,
            #[serde(default)]
            levels: Option<LevelThresholds>,
            #[serde(default)]
            priority_decimals: Option<u32>,
        }

        let file: ProfileFile = toml::from_str(s)?;
        let base = match file.base.as_deref() {
            Some(b) => b.parse::<ProfileName>()?,
            None => default_base,
        };

        let mut p = Self::preset(base);
        if let Some(n) = file.name {
            p.name = n;
        }
        if let Some(w) = file.weights {
            p.weights = w;
        }
        if let Some(e) = file.population {
            p.population = e;
        }
        if let Some(l) = file.levels {
            p.levels = l;
        }
        if file.priority_decimals.is_some() {
            p.priority_decimals = file.priority_decimals;
        }
        p.validate()?;
        Ok(p)
    }

    fn validate(&self) -> Result<()> {
        let w = &self.weights;
        for (name, v) in [
            ("urgency", w.urgency),
            ("population", w.population),
            ("vulnerability", w.vulnerability),
            ("confidence", w.confidence),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(anyhow!("weight `{name}` must be a non-negative number, got {v}"));
            }
        }
        let l = &self.levels;
        if !(0.0..=1.0).contains(&l.medium) || !(0.0..=1.0).contains(&l.high) || l.medium > l.high {
            return Err(anyhow!(
                "level thresholds must satisfy 0 <= medium <= high <= 1 (got medium={}, high={})",
                l.medium,
                l.high
            ));
        }
        Ok(())
    }
}
