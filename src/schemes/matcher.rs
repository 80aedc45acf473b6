//! Scheme matcher: category filter → eligibility → keyword-overlap score.
//!
//! Score is the number of a scheme's keywords found in the complaint text; the
//! category only filters. Ties go to the earlier catalog entry.

use serde::Serialize;

use super::{EligibilityMetadata, SchemeCatalog, SchemeEntry, GENERIC_SCHEME};

const MAX_LISTED_KEYWORDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchPolicy {
    /// Only candidates with at least one keyword hit can win.
    pub require_keyword_hit: bool,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            require_keyword_hit: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemeMatch {
    pub scheme: String,
    pub explanation: String,
    pub matched_keywords: Vec<String>,
    pub score: usize,
    /// True when routed to the generic cell (no match or no catalog).
    pub fallback: bool,
}

impl SchemeMatch {
    fn generic(explanation: &str) -> Self {
        Self {
            scheme: GENERIC_SCHEME.to_string(),
            explanation: explanation.to_string(),
            matched_keywords: Vec::new(),
            score: 0,
            fallback: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemeMatcher {
    catalog: SchemeCatalog,
    policy: MatchPolicy,
}

impl SchemeMatcher {
    pub fn new(catalog: SchemeCatalog, policy: MatchPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn catalog(&self) -> &SchemeCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn match_scheme(
        &self,
        category: &str,
        text: &str,
        area: Option<&str>,
        metadata: Option<&EligibilityMetadata>,
    ) -> SchemeMatch {
        if self.catalog.is_builtin() {
            return SchemeMatch::generic(
                "Scheme engine running in fallback mode (no scheme database loaded on server).",
            );
        }

        let category = category.trim().to_lowercase();
        let text = text.to_lowercase();

        let mut best: Option<(&SchemeEntry, Vec<&str>)> = None;
        for entry in self.catalog.entries() {
            if !entry.covers_category(&category) || !entry.is_eligible(metadata) {
                continue;
            }
            let hits = entry.matched_keywords(&text);
            if self.policy.require_keyword_hit && hits.is_empty() {
                continue;
            }
            let better = match &best {
                None => true,
                Some((_, best_hits)) => hits.len() > best_hits.len(),
            };
            if better {
                best = Some((entry, hits));
            }
        }

        let Some((entry, hits)) = best else {
            return SchemeMatch::generic(
                "No specific welfare scheme matched. Routed to general grievance handling.",
            );
        };

        let listed = hits
            .iter()
            .take(MAX_LISTED_KEYWORDS)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        let mut explanation = format!("Matched scheme '{}' using keywords: ", entry.name);
        if listed.is_empty() {
            explanation.push_str("category relevance");
        } else {
            explanation.push_str(&listed);
        }
        if let Some(a) = area.map(str::trim).filter(|a| !a.is_empty()) {
            explanation.push_str(&format!(". Assigned to local office for area '{a}'."));
        }

        SchemeMatch {
            scheme: entry.name.clone(),
            explanation,
            score: hits.len(),
            matched_keywords: hits.into_iter().map(str::to_string).collect(),
            fallback: false,
        }
    }
}
