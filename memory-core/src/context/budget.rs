//! Token estimation and per-source budget distribution (spec §4.13 steps
//! 3-4).

use std::collections::HashMap;

/// Relative weight of each source when splitting `max_tokens` across the
/// sources actually requested (spec §4.13 step 3).
fn source_weight(source: &str) -> u32 {
    match source {
        "experiences" => 3,
        "code" | "commits" => 2,
        "memories" | "values" => 1,
        _ => 1,
    }
}

/// `ceil(chars / 4)`, the crate-wide token estimate (spec §4.13 step 6,
/// ±20% slack acceptable).
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// `budget[s] = floor((weight[s] / sum(weight)) * max_tokens)` over the
/// requested sources only.
#[must_use]
pub fn distribute(requested: &[String], max_tokens: usize) -> HashMap<String, usize> {
    let total_weight: u32 = requested.iter().map(|s| source_weight(s)).sum();
    if total_weight == 0 {
        return HashMap::new();
    }
    requested
        .iter()
        .map(|s| {
            let budget = (u64::from(source_weight(s)) * max_tokens as u64) / u64::from(total_weight);
            (s.clone(), budget as usize)
        })
        .collect()
}
