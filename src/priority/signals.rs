//! Text heuristics behind the urgency, population and vulnerability sub-scores.
//!
//! Urgency and population are additive over every matching phrase; vulnerability
//! takes the single strongest group mentioned. Every function returns the
//! triggered reasons in table order.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{clamp01, round_to};

pub const URGENCY_BASE: f32 = 0.3;
pub const POPULATION_BASE: f32 = 0.2;

pub const URGENCY_KEYWORDS: &[(&str, f32)] = &[
    ("emergency", 0.30),
    ("urgent", 0.25),
    ("critical", 0.25),
    ("immediately", 0.20),
    ("life-threatening", 0.30),
    ("dangerous", 0.25),
    ("hazardous", 0.25),
    ("severe", 0.20),
    ("acute", 0.20),
    ("collapsed", 0.25),
    ("accident", 0.20),
    ("broken", 0.15),
    ("damaged", 0.15),
    ("overflowing", 0.20),
    ("flooding", 0.25),
    ("outbreak", 0.25),
    ("epidemic", 0.30),
    ("no supply", 0.20),
    ("not working", 0.15),
    ("stopped", 0.20),
];

pub const POPULATION_KEYWORDS: &[(&str, f32)] = &[
    ("entire area", 0.30),
    ("whole colony", 0.30),
    ("complete ward", 0.30),
    ("all residents", 0.30),
    ("entire community", 0.30),
    ("multiple streets", 0.25),
    ("affecting", 0.15),
    ("several households", 0.20),
    ("multiple families", 0.20),
    ("local residents", 0.15),
];

pub const VULNERABILITY_KEYWORDS: &[(&str, f32)] = &[
    ("senior citizens", 0.8),
    ("elderly", 0.8),
    ("old age", 0.8),
    ("children", 0.7),
    ("school children", 0.7),
    ("kids", 0.7),
    ("pregnant", 0.9),
    ("disabled", 0.9),
    ("specially abled", 0.9),
    ("widows", 0.8),
    ("orphans", 0.8),
    ("slum dwellers", 0.7),
    ("tribal", 0.7),
    ("sc/st", 0.7),
    ("below poverty line", 0.8),
    ("daily wage", 0.7),
    ("bpl", 0.8),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DurationUnit {
    Days,
    Weeks,
    Months,
}

impl DurationUnit {
    fn label(self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
        }
    }

    /// (minimum count, cap, divisor)
    fn bonus_rule(self) -> (u64, f32, f32) {
        match self {
            Self::Days => (5, 0.15, 100.0),
            Self::Weeks => (2, 0.20, 30.0),
            Self::Months => (2, 0.25, 20.0),
        }
    }
}

static DURATION_PATTERNS: Lazy<Vec<(Regex, DurationUnit)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"([0-9]+)\s*days?").expect("days regex"), DurationUnit::Days),
        (Regex::new(r"([0-9]+)\s*weeks?").expect("weeks regex"), DurationUnit::Weeks),
        (Regex::new(r"([0-9]+)\s*months?").expect("months regex"), DurationUnit::Months),
    ]
});

/// (pattern, divisor)
static HEADCOUNT_PATTERNS: Lazy<Vec<(Regex, f32)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"\b([0-9]+)\+?\s*households?\b").expect("households regex"), 10.0),
        (Regex::new(r"\b([0-9]+)\+?\s*people\b").expect("people regex"), 5.0),
        (Regex::new(r"\b([0-9]+)\+?\s*families\b").expect("families regex"), 15.0),
    ]
});

/// First captured number of `re` in `t`. Oversized numbers saturate.
fn first_number(re: &Regex, t: &str) -> Option<u64> {
    let caps = re.captures(t)?;
    let digits = caps.get(1)?.as_str();
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

pub fn urgency(text: &str) -> (f32, Vec<String>) {
    let t = text.to_lowercase();
    let mut score = URGENCY_BASE;
    let mut reasons = Vec::new();

    for (k, w) in URGENCY_KEYWORDS {
        if t.contains(k) {
            score += w;
            reasons.push(format!("Urgency keyword '{k}' (+{w:.2})"));
        }
    }

    for (re, unit) in DURATION_PATTERNS.iter() {
        let Some(n) = first_number(re, &t) else {
            continue;
        };
        let (min, cap, divisor) = unit.bonus_rule();
        if n < min {
            continue;
        }
        let add = cap.min(n as f32 / divisor);
        score += add;
        reasons.push(format!("Persisting {n} {} (+{add:.2})", unit.label()));
    }

    (round_to(clamp01(score), 2), reasons)
}

pub fn population_from_text(text: &str) -> (f32, Vec<String>) {
    let t = text.to_lowercase();
    let mut score = POPULATION_BASE;
    let mut reasons = Vec::new();

    for (k, w) in POPULATION_KEYWORDS {
        if t.contains(k) {
            score += w;
            reasons.push(format!("Population keyword '{k}' (+{w:.2})"));
        }
    }

    for (re, divisor) in HEADCOUNT_PATTERNS.iter() {
        if let Some(n) = first_number(re, &t) {
            let add = 0.4f32.min(n as f32 / divisor / 10.0);
            score += add;
            reasons.push(format!("Affects ~{n}+ people (+{add:.2})"));
        }
    }

    (round_to(clamp01(score), 2), reasons)
}

/// Count of prior complaints sharing (area, category) → impact bucket.
pub fn population_from_count(count: u64) -> f32 {
    match count {
        0 => 0.2,
        1 => 0.4,
        2..=5 => 0.6,
        6..=20 => 0.8,
        _ => 1.0,
    }
}

pub fn vulnerability(text: &str) -> (f32, Vec<String>) {
    let t = text.to_lowercase();
    let mut score = 0.0f32;
    let mut reasons = Vec::new();

    for (k, w) in VULNERABILITY_KEYWORDS {
        if t.contains(k) {
            score = score.max(*w);
            reasons.push(format!("Vulnerable group '{k}' (score {w:.2})"));
        }
    }

    (round_to(clamp01(score), 2), reasons)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn urgency_adds_every_keyword() {
        let (s, r) = urgency("EMERGENCY! urgent help needed");
        assert!(approx(s, 0.85), "got {s}");
        assert_eq!(r.len(), 2);
        assert!(r[0].contains("emergency"));
    }

    #[test]
    fn urgency_base_and_clamp() {
        let (s, r) = urgency("");
        assert!(approx(s, 0.3));
        assert!(r.is_empty());

        let (s, _) = urgency("emergency urgent critical dangerous epidemic outbreak collapsed");
        assert!(approx(s, 1.0));
    }

    #[test]
    fn duration_bonus_thresholds() {
        // 3 days is below the 5-day floor.
        let (s, r) = urgency("no water for 3 days");
        assert!(approx(s, 0.3));
        assert!(r.is_empty());

        let (s, _) = urgency("no water for 10 days");
        assert!(approx(s, 0.4), "got {s}");

        // weeks: min(0.20, 3/30) = 0.10
        let (s, _) = urgency("for 3 weeks now");
        assert!(approx(s, 0.4), "got {s}");

        // months: capped at 0.25
        let (s, r) = urgency("pending 12 months");
        assert!(approx(s, 0.55), "got {s}");
        assert!(r[0].contains("12 months"));
    }

    #[test]
    fn only_first_duration_match_counts() {
        // First "days" match is 2 (below floor) so the later 30 is ignored.
        let (s, _) = urgency("2 days ago, then 30 days later");
        assert!(approx(s, 0.3));
    }

    #[test]
    fn population_keywords_and_headcounts() {
        let (s, r) = population_from_text("Entire area affected, 200 households without water");
        // 0.2 + 0.3 + min(0.4, 200/10/10) = 0.9
        assert!(approx(s, 0.9), "got {s}");
        assert_eq!(r.len(), 2);

        let (s, _) = population_from_text("about 10 people");
        // 0.2 + 10/5/10 = 0.4
        assert!(approx(s, 0.4), "got {s}");

        let (s, _) = population_from_text("nothing notable");
        assert!(approx(s, 0.2));
    }

    #[test]
    fn population_count_buckets() {
        assert!(approx(population_from_count(0), 0.2));
        assert!(approx(population_from_count(1), 0.4));
        assert!(approx(population_from_count(2), 0.6));
        assert!(approx(population_from_count(5), 0.6));
        assert!(approx(population_from_count(6), 0.8));
        assert!(approx(population_from_count(20), 0.8));
        assert!(approx(population_from_count(21), 1.0));
    }

    #[test]
    fn vulnerability_takes_maximum() {
        let (s, r) = vulnerability("elderly residents and a pregnant woman");
        assert!(approx(s, 0.9), "got {s}");
        assert_eq!(r.len(), 2);

        let (s, _) = vulnerability("kids and children");
        assert!(approx(s, 0.7));

        let (s, r) = vulnerability("pipeline leak");
        assert!(approx(s, 0.0));
        assert!(r.is_empty());
    }

    #[test]
    fn huge_numbers_saturate() {
        let (s, _) = urgency("99999999999999999999999 months");
        assert!(approx(s, 0.55));
        let (s, _) = population_from_text("99999999999999999999999 people");
        assert!(approx(s, 0.6));
    }
}
