//! Civic triage service: binary entrypoint.
//! Boots the Axum HTTP server with the triage engine, shared state and middleware.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    civic_triage::telemetry::init_tracing();

    Ok(civic_triage::app().into())
}
