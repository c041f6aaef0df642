//! Cross-source deduplication (spec §4.13 step 2): an exact strong-key match
//! or a fuzzy near-duplicate (LCS ratio at or above the configured
//! threshold) is folded into whichever copy has the higher relevance.

use std::collections::HashSet;

use super::types::RawItem;

/// Longest-common-subsequence length is O(n*m); comparisons only look at
/// this many leading characters of each side.
const LCS_COMPARE_CAP: usize = 800;

/// Drop items that exactly share a `dedup_key`, or whose rendered text is a
/// fuzzy near-duplicate (LCS ratio >= `threshold`) of an item already kept.
/// Processes items in relevance-descending order, so the first copy of any
/// duplicate pair encountered is always the higher-relevance one.
#[must_use]
pub fn dedup(mut items: Vec<RawItem>, threshold: f64) -> Vec<RawItem> {
    items.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

    let mut kept: Vec<RawItem> = Vec::with_capacity(items.len());
    let mut seen_keys: HashSet<String> = HashSet::new();

    for item in items {
        if seen_keys.contains(&item.dedup_key) {
            continue;
        }
        let is_fuzzy_dup = kept.iter().any(|k| lcs_ratio(&k.rendered, &item.rendered) >= threshold);
        if is_fuzzy_dup {
            continue;
        }
        seen_keys.insert(item.dedup_key.clone());
        kept.push(item);
    }

    kept
}

/// `2 * LCS(a, b) / (len(a) + len(b))`, in `[0, 1]`.
fn lcs_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().take(LCS_COMPARE_CAP).collect();
    let b: Vec<char> = b.chars().take(LCS_COMPARE_CAP).collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let lcs_len = lcs_length(&a, &b);
    (2 * lcs_len) as f64 / (a.len() + b.len()) as f64
}

fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
