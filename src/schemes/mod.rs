// src/schemes/mod.rs
//! Welfare scheme catalog: loading, eligibility rules and the built-in fallback.
//!
//! JSON shape (array of entries):
//! ```json
//! [{ "name": "Jal Jeevan Mission", "categories": ["water"], "keywords": ["water", "tap"],
//!    "min_age": null, "max_age": null, "income_groups": null }]
//! ```
//! The catalog is immutable once built; reloading means building a new one.

pub mod matcher;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Availability, LoadError};

pub use matcher::{MatchPolicy, SchemeMatch, SchemeMatcher};

pub const GENERIC_SCHEME: &str = "General Grievance Redressal Cell";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeEntry {
    pub name: String,
    /// Empty = applies to every category.
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
    /// Absent or empty = no income restriction.
    #[serde(default)]
    pub income_groups: Option<Vec<String>>,
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Caller-supplied facts used only for eligibility checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityMetadata {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub income_group: Option<String>,
}

impl SchemeEntry {
    pub fn generic() -> Self {
        Self {
            name: GENERIC_SCHEME.to_string(),
            categories: Vec::new(),
            keywords: Vec::new(),
            min_age: None,
            max_age: None,
            income_groups: None,
        }
    }

    /// Empty category set matches every category. `category` is expected lower-cased.
    pub fn covers_category(&self, category: &str) -> bool {
        self.categories.is_empty()
            || self
                .categories
                .iter()
                .any(|c| c.trim().to_lowercase() == category)
    }

    /// Absent metadata passes every rule; a missing age counts as 0.
    pub fn is_eligible(&self, metadata: Option<&EligibilityMetadata>) -> bool {
        let Some(meta) = metadata else {
            return true;
        };
        let age = meta.age.unwrap_or(0);

        if let Some(min) = self.min_age {
            if age < min {
                return false;
            }
        }
        if let Some(max) = self.max_age {
            if age > max {
                return false;
            }
        }
        if let Some(allowed) = self.income_groups.as_ref().filter(|v| !v.is_empty()) {
            match meta.income_group.as_deref() {
                Some(g) if allowed.iter().any(|a| a == g) => {}
                _ => return false,
            }
        }
        true
    }

    /// Keywords found in `text_lower`, in catalog order.
    pub fn matched_keywords(&self, text_lower: &str) -> Vec<&str> {
        self.keywords
            .iter()
            .filter(|k| {
                let k = k.to_lowercase();
                !k.is_empty() && text_lower.contains(k.as_str())
            })
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SchemeCatalog {
    entries: Vec<SchemeEntry>,
    builtin: bool,
}

impl SchemeCatalog {
    /// Build from entries. Later entries reusing a name are dropped.
    pub fn from_entries(entries: Vec<SchemeEntry>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(entries.len());
        for e in entries {
            let name = e.name.trim();
            if name.is_empty() {
                warn!("skipping scheme entry without a name");
                continue;
            }
            if !seen.insert(name.to_string()) {
                warn!(scheme = %name, "duplicate scheme name, keeping the first entry");
                continue;
            }
            kept.push(e);
        }
        Self {
            entries: kept,
            builtin: false,
        }
    }

    /// Minimal catalog used when the real one cannot be loaded.
    pub fn builtin() -> Self {
        Self {
            entries: vec![SchemeEntry::generic()],
            builtin: true,
        }
    }

    /// Parse a JSON array. Entries that do not fit the schema (negative ages,
    /// wrong types) are skipped with a warning; the rest still load.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        let raw: Vec<serde_json::Value> = serde_json::from_str(s)?;
        let entries = raw
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| match serde_json::from_value::<SchemeEntry>(v) {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!(index = i, error = %e, "skipping malformed scheme entry");
                    None
                }
            })
            .collect();
        Ok(Self::from_entries(entries))
    }

    /// Load from `path`; any failure (or an empty catalog) yields the built-in one.
    pub fn load(path: &Path) -> (Self, Availability) {
        match Self::try_load(path) {
            Ok(c) => {
                info!(path = %path.display(), schemes = c.len(), "scheme catalog loaded");
                (c, Availability::Ready)
            }
            Err(err) => {
                warn!(error = %err, "scheme catalog unavailable, using generic fallback");
                (Self::builtin(), Availability::degraded(&err))
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self, LoadError> {
        let raw = fs::read_to_string(path).map_err(|e| LoadError::from_io(path, e))?;
        let catalog = Self::from_json_str(&raw).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if catalog.is_empty() {
            return Err(LoadError::invalid(path, "catalog contains no schemes"));
        }
        Ok(catalog)
    }

    pub fn entries(&self) -> &[SchemeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }
}
