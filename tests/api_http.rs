// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use civic_triage::{api, AppState, Settings};

const BODY_LIMIT: usize = 1024 * 1024;

fn settings(model: &str) -> Settings {
    Settings {
        model_path: model.into(),
        schemes_path: "config/schemes.json".into(),
        ..Settings::default()
    }
}

/// Router over the shipped catalog and no model (rule mode).
fn test_router() -> (Router, AppState) {
    let state = AppState::from_settings(settings("missing/model.json"));
    (api::router(state.clone()), state)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

#[tokio::test]
async fn health_reports_degraded_classifier() {
    let (app, _) = test_router();
    let (status, v) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "degraded");
    assert_eq!(v["mode"], "rules");
    assert_eq!(v["builtin_catalog"], false);
    assert_eq!(v["boot"]["classifier"]["status"], "degraded");
    assert_eq!(v["boot"]["schemes"]["status"], "ready");
}

#[tokio::test]
async fn analyze_returns_full_record() {
    let (app, _) = test_router();
    let payload = json!({
        "text": "No water supply for 3 days, elderly residents suffering",
        "area": "Ward 5"
    });
    let (status, v) = send(app, post_json("/analyze", &payload)).await;
    assert_eq!(status, StatusCode::OK);
    for key in [
        "category",
        "confidence",
        "mode",
        "urgency",
        "population_impact",
        "vulnerability",
        "priority_score",
        "priority_level",
        "scheme",
        "explanation",
    ] {
        assert!(!v[key].is_null(), "missing {key}");
    }
    assert_eq!(v["category"], "Water");
    assert_eq!(v["scheme"], "Jal Jeevan Mission");
    assert_eq!(v["explanation"]["vulnerability"]["value"], json!(0.8));
    assert!(["HIGH", "MEDIUM", "LOW"].contains(&v["priority_level"].as_str().unwrap()));
}

#[tokio::test]
async fn analyze_records_history_for_later_requests() {
    let (_, state) = test_router();
    let payload = json!({ "text": "Garbage dump not cleared", "area": "Ward 9" });

    let (_, first) = send(api::router(state.clone()), post_json("/analyze", &payload)).await;
    for _ in 0..3 {
        send(api::router(state.clone()), post_json("/analyze", &payload)).await;
    }
    let (_, later) = send(api::router(state.clone()), post_json("/analyze", &payload)).await;

    assert!(later["population_impact"].as_f64() > first["population_impact"].as_f64());
    assert_eq!(state.counts.total(), 5);
}

#[tokio::test]
async fn analyze_honours_eligibility_metadata() {
    let (_, state) = test_router();
    let text = "Old age pension not credited for months";
    let young = json!({ "text": text, "metadata": { "age": 35, "income_group": "BPL" } });
    let old = json!({ "text": text, "metadata": { "age": 70, "income_group": "BPL" } });

    let (_, a) = send(api::router(state.clone()), post_json("/analyze", &young)).await;
    let (_, b) = send(api::router(state), post_json("/analyze", &old)).await;
    assert_eq!(a["scheme"], "General Grievance Redressal Cell");
    assert_eq!(b["scheme"], "Indira Gandhi National Old Age Pension Scheme");
}

#[tokio::test]
async fn analyze_rejects_missing_text() {
    let (app, _) = test_router();
    let (status, _) = send(app, post_json("/analyze", &json!({ "area": "Ward 1" }))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn model_endpoint_lists_rule_keywords_in_rule_mode() {
    let (app, _) = test_router();
    let (status, v) = send(app, get("/model?top=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["mode"], "rules");
    assert_eq!(v["labels"][0], "Water");
    let water = v["top_features"]["Water"].as_array().unwrap();
    assert_eq!(water.len(), 2);
    assert_eq!(water[0]["feature"], "water");
}

#[tokio::test]
async fn admin_reload_picks_up_new_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let schemes = dir.path().join("schemes.json");
    std::fs::write(&schemes, "not yet").unwrap();

    let state = AppState::from_settings(Settings {
        model_path: dir.path().join("model.json"),
        schemes_path: schemes.clone(),
        ..Settings::default()
    });
    assert!(state.engine.snapshot().matcher().catalog().is_builtin());

    std::fs::write(
        &schemes,
        r#"[{"name": "Street Light Repair", "categories": ["Roads"], "keywords": ["street", "light"]}]"#,
    )
    .unwrap();
    let (status, v) = send(
        api::router(state.clone()),
        Request::builder()
            .method("POST")
            .uri("/admin/reload")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["schemes"]["status"], "ready");

    let (_, rec) = send(
        api::router(state),
        post_json("/analyze", &json!({ "text": "street light broken" })),
    )
    .await;
    assert_eq!(rec["scheme"], "Street Light Repair");
}
