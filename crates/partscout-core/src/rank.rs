//! Result ordering under a selectable ranking policy.
//!
//! Every mode ends its key chain with the original input index, so items
//! the keys cannot separate never reorder relative to each other.

use std::cmp::Ordering;

use crate::candidate::{NormalizedResult, RankMode};

/// Totally orders `results` under `mode`.
///
/// Price comparisons use the effective price (price plus shipping, with
/// unknown shipping treated as zero):
/// - [`RankMode::Best`]: match score descending, then effective price
///   ascending, then original index.
/// - [`RankMode::Cheapest`]: effective price ascending, then original index.
/// - [`RankMode::Expensive`]: effective price descending, then original
///   index.
#[must_use]
pub fn rank_results(results: Vec<NormalizedResult>, mode: RankMode) -> Vec<NormalizedResult> {
    let mut decorated: Vec<(usize, f64, NormalizedResult)> = results
        .into_iter()
        .enumerate()
        .map(|(index, result)| (index, result.effective_price(), result))
        .collect();

    decorated.sort_by(|a, b| compare(a, b, mode));

    decorated.into_iter().map(|(_, _, result)| result).collect()
}

fn compare(
    (a_index, a_price, a): &(usize, f64, NormalizedResult),
    (b_index, b_price, b): &(usize, f64, NormalizedResult),
    mode: RankMode,
) -> Ordering {
    let by_price = match mode {
        RankMode::Cheapest | RankMode::Best => a_price.total_cmp(b_price),
        RankMode::Expensive => b_price.total_cmp(a_price),
    };

    let keyed = match mode {
        RankMode::Best => b.match_score.total_cmp(&a.match_score).then(by_price),
        RankMode::Cheapest | RankMode::Expensive => by_price,
    };

    keyed.then(a_index.cmp(b_index))
}
