// src/config.rs
//! Runtime settings read from `TRIAGE_*` environment variables (`.env` honoured via dotenvy).
//!
//! Unrecognised values fall back to defaults with a warning; nothing here fails startup.

use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Availability;
use crate::priority::{ProfileName, WeightProfile};
use crate::schemes::MatchPolicy;
use crate::telemetry::parse_flag;

pub const DEFAULT_MODEL_PATH: &str = "model/model.json";
pub const DEFAULT_SCHEMES_PATH: &str = "config/schemes.json";
pub const DEFAULT_PROFILE_PATH: &str = "config/triage.toml";

pub const ENV_MODEL_PATH: &str = "TRIAGE_MODEL_PATH";
pub const ENV_SCHEMES_PATH: &str = "TRIAGE_SCHEMES_PATH";
pub const ENV_PROFILE: &str = "TRIAGE_PROFILE";
pub const ENV_PROFILE_PATH: &str = "TRIAGE_PROFILE_PATH";
pub const ENV_REQUIRE_KEYWORD_HIT: &str = "TRIAGE_REQUIRE_KEYWORD_HIT";
pub const ENV_HOT_RELOAD: &str = "TRIAGE_HOT_RELOAD";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model_path: PathBuf,
    pub schemes_path: PathBuf,
    pub profile: ProfileName,
    /// TOML override for the priority profile. `None` = use the preset as is.
    pub profile_path: Option<PathBuf>,
    pub require_keyword_hit: bool,
    /// Requested only; the watcher still checks for a dev environment.
    pub hot_reload: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            schemes_path: PathBuf::from(DEFAULT_SCHEMES_PATH),
            profile: ProfileName::Balanced,
            profile_path: None,
            require_keyword_hit: true,
            hot_reload: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup (tests pass a map instead of the process env).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut s = Self::default();
        let non_empty = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(p) = non_empty(ENV_MODEL_PATH) {
            s.model_path = PathBuf::from(p);
        }
        if let Some(p) = non_empty(ENV_SCHEMES_PATH) {
            s.schemes_path = PathBuf::from(p);
        }
        if let Some(raw) = non_empty(ENV_PROFILE) {
            match raw.parse::<ProfileName>() {
                Ok(p) => s.profile = p,
                Err(e) => {
                    warn!(error = %e, key = ENV_PROFILE, "ignoring profile name, using balanced");
                }
            }
        }
        s.profile_path = match non_empty(ENV_PROFILE_PATH) {
            Some(p) => Some(PathBuf::from(p)),
            None => Some(PathBuf::from(DEFAULT_PROFILE_PATH)).filter(|p| p.exists()),
        };
        s.require_keyword_hit = flag(&non_empty, ENV_REQUIRE_KEYWORD_HIT, true);
        s.hot_reload = flag(&non_empty, ENV_HOT_RELOAD, false);
        s
    }

    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy {
            require_keyword_hit: self.require_keyword_hit,
        }
    }

    /// Preset named by `profile`, overlaid with `profile_path` when set.
    /// A broken override file degrades to the bare preset.
    pub fn weight_profile(&self) -> (WeightProfile, Availability) {
        let Some(path) = self.profile_path.as_deref() else {
            return (WeightProfile::preset(self.profile), Availability::Ready);
        };
        load_profile(path, self.profile)
    }
}

fn load_profile(path: &Path, base: ProfileName) -> (WeightProfile, Availability) {
    match WeightProfile::from_toml_file(path, base) {
        Ok(p) => (p, Availability::Ready),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "priority profile override unusable, using preset");
            (
                WeightProfile::preset(base),
                Availability::Degraded {
                    reason: format!("{e:#}"),
                },
            )
        }
    }
}

fn flag(get: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match get(key) {
        None => default,
        Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
            warn!(%key, value = %raw, "unrecognised boolean, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Settings {
        let m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| m.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let s = from_map(&[]);
        assert_eq!(s.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(s.schemes_path, PathBuf::from(DEFAULT_SCHEMES_PATH));
        assert_eq!(s.profile, ProfileName::Balanced);
        assert!(s.require_keyword_hit);
        assert!(!s.hot_reload);
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let s = from_map(&[
            (ENV_MODEL_PATH, "/srv/m.json"),
            (ENV_PROFILE, "impact"),
            (ENV_REQUIRE_KEYWORD_HIT, "0"),
            (ENV_HOT_RELOAD, "perhaps"),
            (ENV_PROFILE_PATH, "/srv/triage.toml"),
        ]);
        assert_eq!(s.model_path, PathBuf::from("/srv/m.json"));
        assert_eq!(s.profile, ProfileName::Impact);
        assert!(!s.match_policy().require_keyword_hit);
        assert!(!s.hot_reload);
        assert_eq!(s.profile_path, Some(PathBuf::from("/srv/triage.toml")));

        let s = from_map(&[(ENV_PROFILE, "loudest")]);
        assert_eq!(s.profile, ProfileName::Balanced);
    }

    #[test]
    fn broken_profile_file_degrades_to_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage.toml");
        std::fs::write(&path, "[weights]\nurgency = \"lots\"\n").unwrap();

        let s = Settings {
            profile: ProfileName::Impact,
            profile_path: Some(path),
            ..Settings::default()
        };
        let (p, avail) = s.weight_profile();
        assert_eq!(p, WeightProfile::impact());
        assert!(!avail.is_ready());
    }
}
