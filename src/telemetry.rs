// src/telemetry.rs
//! Tracing setup and the dev-only logging helpers.
//!
//! Complaint text is never logged. Dev logs identify a complaint by a short
//! SHA-256 prefix of its text.

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "civic_triage=info,warn";

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
/// `TRIAGE_LOG_JSON=1` switches to JSON lines.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = env_flag("TRIAGE_LOG_JSON").unwrap_or(false);
    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_ok() {
        info!(json, "tracing initialised");
    }
}

/// Debug build, or `SHUTTLE_ENV` in {local, development, dev}.
pub fn is_dev_env() -> bool {
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// `TRIAGE_DEV_LOG=1` in a dev environment.
pub fn dev_logging_enabled() -> bool {
    env_flag("TRIAGE_DEV_LOG").unwrap_or(false) && is_dev_env()
}

/// First 6 bytes of SHA-256 as lowercase hex.
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

/// Parse a boolean env var. `None` when unset or unrecognised.
pub fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|v| parse_flag(&v))
}

pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_hash_is_short_stable_hex() {
        let a = anon_hash("no water for 3 days");
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, anon_hash("no water for 3 days"));
        assert_ne!(a, anon_hash("no water for 4 days"));
    }

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag(" YES "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
