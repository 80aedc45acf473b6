// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod explain;
pub mod history;
pub mod metrics;
pub mod priority;
pub mod schemes;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::classify::{CategoryClassifier, ClassificationResult, ClassifierMode};
pub use crate::config::Settings;
pub use crate::engine::{BootReport, Complaint, EngineHandle, TriageEngine, TriageRecord};
pub use crate::error::{Availability, LoadError};
pub use crate::history::{HistoricalCounts, InMemoryCounts, NoHistory};
pub use crate::priority::{
    PriorityLevel, PriorityScorer, ProfileName, ScoreBreakdown, WeightProfile,
};
pub use crate::schemes::{
    EligibilityMetadata, MatchPolicy, SchemeCatalog, SchemeMatch, SchemeMatcher,
};

/// Build the full HTTP app from the environment: settings, engine, router,
/// plus `/metrics` when the Prometheus recorder can be installed.
pub fn app() -> axum::Router {
    let settings = Settings::from_env();
    let state = AppState::from_settings(settings.clone());
    engine::start_hot_reload_thread(state.engine.clone(), settings);

    let router = api::router(state);
    match metrics::Metrics::init() {
        Ok(m) => router.merge(m.router()),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder unavailable, /metrics disabled");
            router
        }
    }
}
