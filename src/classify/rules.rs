//! Keyword-rule fallback classifier.
//!
//! Rules are evaluated top to bottom and the first rule with any substring hit
//! wins. The order is part of the contract: water terms are checked before road
//! terms, so "water pipe burst on the main road" stays a Water complaint.

use super::{ClassificationResult, ClassifierMode};

pub const RULE_CONFIDENCE: f32 = 0.6;
pub const OTHER_CATEGORY: &str = "Other";
pub const OTHER_CONFIDENCE: f32 = 0.5;

/// (category, substrings) in evaluation order.
pub const CATEGORY_RULES: &[(&str, &[&str])] = &[
    ("Water", &["water", "pipe", "tanker"]),
    ("Roads", &["road", "pothole", "street"]),
    ("Electricity", &["electric", "power", "light"]),
    ("Health", &["hospital", "medicine", "ambulance"]),
    ("Welfare", &["ration", "pension", "scholarship"]),
    ("Sanitation", &["garbage", "sewage", "sanitation"]),
    ("Housing", &["house", "housing", "construction"]),
];

pub fn classify_by_rules(text: &str) -> ClassificationResult {
    let t = text.to_lowercase();

    for (category, needles) in CATEGORY_RULES {
        if needles.iter().any(|n| t.contains(n)) {
            return ClassificationResult {
                category: (*category).to_string(),
                confidence: RULE_CONFIDENCE,
                probabilities: None,
                mode: ClassifierMode::Rules,
            };
        }
    }

    ClassificationResult {
        category: OTHER_CATEGORY.to_string(),
        confidence: OTHER_CONFIDENCE,
        probabilities: None,
        mode: ClassifierMode::Rules,
    }
}
