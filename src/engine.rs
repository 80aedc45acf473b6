//! # Triage Engine
//! Immutable snapshot of classifier + scorer + matcher, and the handle that swaps
//! whole snapshots on reload.
//!
//! Flow per complaint: classify first, then score and match on the classifier's
//! output, then merge everything into one [`TriageRecord`] with an [`Explanation`].
//! No I/O happens in [`TriageEngine::analyze`] besides the injected count lookup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::{info, warn};

use crate::classify::{CategoryClassifier, ClassifierMode};
use crate::config::Settings;
use crate::error::Availability;
use crate::explain::Explanation;
use crate::history::HistoricalCounts;
use crate::priority::{PriorityLevel, PriorityScorer, WeightProfile};
use crate::schemes::{EligibilityMetadata, MatchPolicy, SchemeCatalog, SchemeMatcher};
use crate::telemetry::{anon_hash, dev_logging_enabled, is_dev_env};

/// One incoming grievance. Never stored by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    pub text: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Complaint {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn in_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageRecord {
    pub category: String,
    pub confidence: f32,
    #[serde(rename = "mode")]
    pub classifier_mode: ClassifierMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<BTreeMap<String, f32>>,
    pub urgency: f32,
    pub population_impact: f32,
    pub vulnerability: f32,
    pub priority_score: f32,
    pub priority_level: PriorityLevel,
    pub scheme: String,
    pub scheme_fallback: bool,
    pub explanation: Explanation,
}

/// Per-component load outcome from [`TriageEngine::bootstrap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootReport {
    pub classifier: Availability,
    pub schemes: Availability,
    pub profile: Availability,
}

impl BootReport {
    pub fn all_ready(&self) -> bool {
        self.components().iter().all(|(_, a)| a.is_ready())
    }

    pub fn components(&self) -> [(&'static str, &Availability); 3] {
        [
            ("classifier", &self.classifier),
            ("schemes", &self.schemes),
            ("profile", &self.profile),
        ]
    }
}

#[derive(Debug)]
pub struct TriageEngine {
    classifier: CategoryClassifier,
    scorer: PriorityScorer,
    matcher: SchemeMatcher,
}

impl Default for TriageEngine {
    /// Rule classifier, balanced profile, built-in catalog.
    fn default() -> Self {
        Self::new(
            CategoryClassifier::rules_only(),
            PriorityScorer::default(),
            SchemeMatcher::new(SchemeCatalog::builtin(), MatchPolicy::default()),
        )
    }
}

impl TriageEngine {
    pub fn new(
        classifier: CategoryClassifier,
        scorer: PriorityScorer,
        matcher: SchemeMatcher,
    ) -> Self {
        Self {
            classifier,
            scorer,
            matcher,
        }
    }

    /// Load every component named by `settings`. Never fails: each unavailable
    /// resource falls back and is reported in the [`BootReport`].
    pub fn bootstrap(settings: &Settings) -> (Self, BootReport) {
        let (classifier, classifier_avail) = CategoryClassifier::load(&settings.model_path);
        let (catalog, schemes_avail) = SchemeCatalog::load(&settings.schemes_path);
        let (profile, profile_avail) = settings.weight_profile();

        let report = BootReport {
            classifier: classifier_avail,
            schemes: schemes_avail,
            profile: profile_avail,
        };
        info!(
            mode = classifier.mode().as_str(),
            profile = %profile.name,
            schemes = catalog.len(),
            ready = report.all_ready(),
            "triage engine ready"
        );
        crate::metrics::record_boot(&report);

        let engine = Self::new(
            classifier,
            PriorityScorer::new(profile),
            SchemeMatcher::new(catalog, settings.match_policy()),
        );
        (engine, report)
    }

    pub fn classifier(&self) -> &CategoryClassifier {
        &self.classifier
    }

    pub fn profile(&self) -> &WeightProfile {
        self.scorer.profile()
    }

    pub fn matcher(&self) -> &SchemeMatcher {
        &self.matcher
    }

    pub fn analyze(
        &self,
        complaint: &Complaint,
        metadata: Option<&EligibilityMetadata>,
        counts: &dyn HistoricalCounts,
    ) -> TriageRecord {
        let started = Instant::now();
        let text = complaint.text.as_str();
        let area = complaint.area.as_deref();

        let classification = self.classifier.classify(text);
        let scores = self.scorer.score(
            text,
            area,
            Some(&classification.category),
            classification.confidence,
            counts,
        );
        let scheme = self
            .matcher
            .match_scheme(&classification.category, text, area, metadata);
        let explanation = Explanation::build(&classification, &scores, &scheme);

        let record = TriageRecord {
            category: classification.category,
            confidence: classification.confidence,
            classifier_mode: classification.mode,
            probabilities: classification.probabilities,
            urgency: scores.urgency.value,
            population_impact: scores.population_impact.value,
            vulnerability: scores.vulnerability.value,
            priority_score: scores.priority_score,
            priority_level: scores.priority_level,
            scheme: scheme.scheme,
            scheme_fallback: scheme.fallback,
            explanation,
        };

        crate::metrics::record_triage(&record, started.elapsed().as_secs_f64() * 1000.0);
        if dev_logging_enabled() {
            // Never log raw text.
            info!(
                target: "civic_triage::triage",
                id = %anon_hash(text),
                category = %record.category,
                mode = record.classifier_mode.as_str(),
                priority = record.priority_score,
                level = ?record.priority_level,
                scheme = %record.scheme
            );
        }
        record
    }
}

/* ----------------------------
Thread-safe handle + hot reload
---------------------------- */

/// Shared handle to the current engine snapshot. Readers clone the inner `Arc`
/// and drop the lock at once; reload replaces the whole snapshot.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<RwLock<Arc<TriageEngine>>>,
}

impl EngineHandle {
    pub fn new(engine: TriageEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(engine))),
        }
    }

    pub fn snapshot(&self) -> Arc<TriageEngine> {
        match self.inner.read() {
            Ok(g) => Arc::clone(&g),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn swap(&self, engine: TriageEngine) {
        let fresh = Arc::new(engine);
        match self.inner.write() {
            Ok(mut g) => *g = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
    }

    /// Rebuild from `settings` and swap it in.
    pub fn reload(&self, settings: &Settings) -> BootReport {
        let (engine, report) = TriageEngine::bootstrap(settings);
        self.swap(engine);
        info!(ready = report.all_ready(), "triage engine reloaded");
        report
    }
}

/// Polls the model, catalog and profile files every 2s and reloads when any
/// mtime moves forward. Requires `settings.hot_reload` and a dev environment.
pub fn start_hot_reload_thread(handle: EngineHandle, settings: Settings) -> bool {
    if !(settings.hot_reload && is_dev_env()) {
        return false;
    }

    let mut watched: Vec<PathBuf> =
        vec![settings.model_path.clone(), settings.schemes_path.clone()];
    if let Some(p) = &settings.profile_path {
        watched.push(p.clone());
    }

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last: Vec<Option<SystemTime>> = watched.iter().map(|p| mtime(p)).collect();

        loop {
            thread::sleep(poll);
            let now: Vec<Option<SystemTime>> = watched.iter().map(|p| mtime(p)).collect();
            let changed = now.iter().zip(&last).any(|(n, l)| match (n, l) {
                (Some(n), Some(l)) => n > l,
                (Some(_), None) => true,
                _ => false,
            });
            if changed {
                let report = handle.reload(&settings);
                if !report.all_ready() {
                    warn!(?report, "hot reload finished with degraded components");
                }
            }
            last = now;
        }
    });
    info!("triage hot reload watcher started");
    true
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
