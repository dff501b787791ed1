//! The summary accumulator (§4.C): a pure in-memory aggregator with no
//! I/O and no concurrency, used identically by the daily computer and
//! the monthly aggregator.

use std::collections::BTreeMap;

/// `map[key] = (map[key] ?? 0) + 1`.
pub fn increment(map: &mut BTreeMap<String, u64>, key: &str) {
    *map.entry(key.to_string()).or_insert(0) += 1;
}

/// `dest[k] += src[k]` for every `k` in `src`.
pub fn increment_all(dest: &mut BTreeMap<String, u64>, src: &BTreeMap<String, u64>) {
    for (k, v) in src {
        *dest.entry(k.clone()).or_insert(0) += v;
    }
}

/// Sum of every value in `map`.
pub fn total(map: &BTreeMap<String, u64>) -> u64 {
    map.values().sum()
}

/// Merge every dimension's bucket map from `src` into `dest`, creating
/// dimensions and buckets as needed. Used by the monthly aggregator to
/// fold a daily summary's `dimensionDownloads` into the month's.
pub fn increment_all_dimensions(
    dest: &mut BTreeMap<String, BTreeMap<String, u64>>,
    src: &BTreeMap<String, BTreeMap<String, u64>>,
) {
    for (dimension, buckets) in src {
        increment_all(dest.entry(dimension.clone()).or_default(), buckets);
    }
}

/// Lexicographic minimum of two hour-bucket strings (`YYYY-MM-DDTHH`),
/// which is also their chronological minimum under the fixed format.
/// `None` inputs are treated as absent, not as smaller.
pub fn min_hour(current: Option<&str>, candidate: &str) -> String {
    match current {
        Some(c) if c <= candidate => c.to_string(),
        _ => candidate.to_string(),
    }
}
