// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::engine::{BootReport, TriageRecord};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Fails if a global recorder is already set.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        ensure_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "triage_complaints_total",
            "Complaints triaged, by category and classifier mode."
        );
        describe_counter!(
            "triage_scheme_fallback_total",
            "Complaints routed to the generic grievance cell."
        );
        describe_gauge!(
            "triage_engine_degraded",
            "1 when a startup component runs on its fallback."
        );
        describe_histogram!("triage_analyze_ms", "Time spent in the triage pipeline.");
    });
}

pub(crate) fn record_triage(record: &TriageRecord, elapsed_ms: f64) {
    counter!(
        "triage_complaints_total",
        "category" => record.category.clone(),
        "mode" => record.classifier_mode.as_str()
    )
    .increment(1);
    if record.scheme_fallback {
        counter!("triage_scheme_fallback_total").increment(1);
    }
    histogram!("triage_analyze_ms").record(elapsed_ms);
}

pub(crate) fn record_boot(report: &BootReport) {
    for (component, avail) in report.components() {
        let v = if avail.is_ready() { 0.0 } else { 1.0 };
        gauge!("triage_engine_degraded", "component" => component).set(v);
    }
}
