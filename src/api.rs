use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::classify::rules::CATEGORY_RULES;
use crate::classify::ClassifierMode;
use crate::config::Settings;
use crate::engine::{BootReport, Complaint, EngineHandle, TriageEngine, TriageRecord};
use crate::history::InMemoryCounts;
use crate::schemes::EligibilityMetadata;

const DEFAULT_TOP_FEATURES: usize = 10;
const MAX_TOP_FEATURES: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub counts: Arc<InMemoryCounts>,
    pub settings: Settings,
    boot: Arc<RwLock<BootReport>>,
}

impl AppState {
    pub fn new(engine: TriageEngine, boot: BootReport, settings: Settings) -> Self {
        Self {
            engine: EngineHandle::new(engine),
            counts: Arc::new(InMemoryCounts::default()),
            settings,
            boot: Arc::new(RwLock::new(boot)),
        }
    }

    /// Bootstrap from settings; missing resources degrade, never fail.
    pub fn from_settings(settings: Settings) -> Self {
        let (engine, boot) = TriageEngine::bootstrap(&settings);
        Self::new(engine, boot, settings)
    }

    pub fn boot_report(&self) -> Option<BootReport> {
        self.boot.read().ok().map(|b| b.clone())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/model", get(model_info))
        .route("/admin/reload", post(admin_reload))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthOut {
    status: &'static str,
    mode: ClassifierMode,
    profile: String,
    schemes: usize,
    builtin_catalog: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    boot: Option<BootReport>,
}

async fn health(State(state): State<AppState>) -> Json<HealthOut> {
    let engine = state.engine.snapshot();
    let boot = state.boot_report();
    let status = match &boot {
        Some(b) if !b.all_ready() => "degraded",
        _ => "ok",
    };
    Json(HealthOut {
        status,
        mode: engine.classifier().mode(),
        profile: engine.profile().name.clone(),
        schemes: engine.matcher().catalog().len(),
        builtin_catalog: engine.matcher().catalog().is_builtin(),
        boot,
    })
}

#[derive(Deserialize)]
struct AnalyzeReq {
    text: String,
    #[serde(default)]
    area: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    metadata: Option<EligibilityMetadata>,
}

/// Scores against prior history first, then records this complaint.
async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Json<TriageRecord> {
    let complaint = Complaint {
        text: body.text,
        area: body.area,
        status: body.status,
    };
    let engine = state.engine.snapshot();
    let record = engine.analyze(&complaint, body.metadata.as_ref(), state.counts.as_ref());

    if let Some(area) = complaint.area.as_deref().filter(|a| !a.trim().is_empty()) {
        state.counts.record(area, &record.category);
    }
    debug!(category = %record.category, level = ?record.priority_level, "complaint triaged");
    Json(record)
}

#[derive(Deserialize)]
struct ModelQuery {
    #[serde(default)]
    top: Option<usize>,
}

#[derive(Serialize)]
struct ModelOut {
    mode: ClassifierMode,
    labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feature_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trained_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_type: Option<String>,
    /// Per label: strongest features (model mode) or rule keywords (rule mode).
    top_features: BTreeMap<String, Vec<FeatureOut>>,
}

#[derive(Serialize)]
struct FeatureOut {
    feature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<f32>,
}

async fn model_info(State(state): State<AppState>, Query(q): Query<ModelQuery>) -> Json<ModelOut> {
    let engine = state.engine.snapshot();
    let top = q.top.unwrap_or(DEFAULT_TOP_FEATURES).clamp(1, MAX_TOP_FEATURES);

    let out = match engine.classifier().model() {
        Some(m) => ModelOut {
            mode: ClassifierMode::Model,
            labels: m.labels.clone(),
            feature_count: Some(m.feature_names.len()),
            trained_at: m.metadata.as_ref().and_then(|md| md.trained_at),
            model_type: m.metadata.as_ref().and_then(|md| md.model_type.clone()),
            top_features: m
                .top_features(top)
                .into_iter()
                .map(|(label, feats)| {
                    let feats = feats
                        .into_iter()
                        .map(|(feature, w)| FeatureOut {
                            feature,
                            weight: Some(w),
                        })
                        .collect();
                    (label, feats)
                })
                .collect(),
        },
        None => ModelOut {
            mode: ClassifierMode::Rules,
            labels: CATEGORY_RULES.iter().map(|(c, _)| c.to_string()).collect(),
            feature_count: None,
            trained_at: None,
            model_type: None,
            top_features: CATEGORY_RULES
                .iter()
                .map(|(c, kws)| {
                    let feats = kws
                        .iter()
                        .take(top)
                        .map(|k| FeatureOut {
                            feature: k.to_string(),
                            weight: None,
                        })
                        .collect();
                    (c.to_string(), feats)
                })
                .collect(),
        },
    };
    Json(out)
}

/// Rebuilds the engine off the async workers (loading reads from disk).
async fn admin_reload(State(state): State<AppState>) -> Result<Json<BootReport>, StatusCode> {
    let engine = state.engine.clone();
    let settings = state.settings.clone();
    let report = tokio::task::spawn_blocking(move || engine.reload(&settings))
        .await
        .map_err(|e| {
            warn!(error = %e, "reload task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if let Ok(mut b) = state.boot.write() {
        *b = report.clone();
    }
    info!(ready = report.all_ready(), "reload requested over http");
    Ok(Json(report))
}
