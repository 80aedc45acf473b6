//! Historical complaint counts per (area, category).
//!
//! The persistence layer owns the real numbers; the scorer only sees the
//! [`HistoricalCounts`] trait. [`InMemoryCounts`] backs the HTTP surface and tests.

use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Upper bound on distinct (area, category) keys held in memory.
pub const MAX_TRACKED_KEYS: usize = 10_000;

/// Synchronous lookup of how many prior complaints share `(area, category)`.
pub trait HistoricalCounts {
    fn count(&self, area: &str, category: &str) -> u64;
}

impl<F> HistoricalCounts for F
where
    F: Fn(&str, &str) -> u64,
{
    fn count(&self, area: &str, category: &str) -> u64 {
        self(area, category)
    }
}

/// Always zero. Useful when no persistence collaborator is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl HistoricalCounts for NoHistory {
    fn count(&self, _area: &str, _category: &str) -> u64 {
        0
    }
}

/// Thread-safe in-memory counter. Areas match case-insensitively after trimming;
/// categories match exactly, as the persistence layer stores them.
///
/// Holds at most `cap` distinct keys. Once full, known keys keep counting and
/// new keys are dropped.
#[derive(Debug)]
pub struct InMemoryCounts {
    inner: RwLock<HashMap<(String, String), u64>>,
    cap: usize,
}

impl Default for InMemoryCounts {
    fn default() -> Self {
        Self::with_capacity(MAX_TRACKED_KEYS)
    }
}

impl InMemoryCounts {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.min(MAX_TRACKED_KEYS);
        Self {
            inner: RwLock::new(HashMap::with_capacity(cap.min(1024))),
            cap,
        }
    }

    /// Returns `false` when the key was new and the store is full.
    pub fn record(&self, area: &str, category: &str) -> bool {
        let key = key(area, category);
        let Ok(mut map) = self.inner.write() else {
            return false;
        };
        if let Some(n) = map.get_mut(&key) {
            *n += 1;
            return true;
        }
        if map.len() >= self.cap {
            debug!(cap = self.cap, "history store full, new area not tracked");
            return false;
        }
        map.insert(key, 1);
        true
    }

    /// Distinct (area, category) keys currently tracked.
    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total(&self) -> u64 {
        self.inner
            .read()
            .map(|m| m.values().sum())
            .unwrap_or_default()
    }
}

impl HistoricalCounts for InMemoryCounts {
    fn count(&self, area: &str, category: &str) -> u64 {
        self.inner
            .read()
            .ok()
            .and_then(|m| m.get(&key(area, category)).copied())
            .unwrap_or(0)
    }
}

fn key(area: &str, category: &str) -> (String, String) {
    (area.trim().to_lowercase(), category.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_per_area_and_category() {
        let c = InMemoryCounts::default();
        c.record("Ward 5", "Water");
        c.record(" ward 5 ", "Water");
        c.record("Ward 5", "Roads");
        assert_eq!(c.count("WARD 5", "Water"), 2);
        assert_eq!(c.count("Ward 5", "Roads"), 1);
        assert_eq!(c.count("Ward 6", "Water"), 0);
        assert_eq!(c.total(), 3);
    }

    #[test]
    fn distinct_keys_are_capped() {
        let c = InMemoryCounts::with_capacity(3);
        assert!(c.record("Ward 1", "Water"));
        assert!(c.record("Ward 2", "Water"));
        assert!(c.record("Ward 3", "Water"));
        assert!(!c.record("Ward 4", "Water"));
        assert_eq!(c.len(), 3);
        assert_eq!(c.count("Ward 4", "Water"), 0);

        // Known keys keep counting once full.
        assert!(c.record("ward 1", "Water"));
        assert_eq!(c.count("Ward 1", "Water"), 2);
    }

    #[test]
    fn default_store_stays_bounded_under_many_areas() {
        let c = InMemoryCounts::default();
        for i in 0..(MAX_TRACKED_KEYS + 5_000) {
            c.record(&format!("area-{i}"), "Roads");
        }
        assert_eq!(c.len(), MAX_TRACKED_KEYS);
        assert_eq!(c.total(), MAX_TRACKED_KEYS as u64);

        // Requested capacity never exceeds the hard bound.
        assert!(InMemoryCounts::with_capacity(usize::MAX).cap <= MAX_TRACKED_KEYS);
    }

    #[test]
    fn closures_are_count_sources() {
        let src = |area: &str, _category: &str| -> u64 { if area == "A" { 7 } else { 0 } };
        assert_eq!(src.count("A", "Water"), 7);
        assert_eq!(NoHistory.count("A", "Water"), 0);
    }
}
