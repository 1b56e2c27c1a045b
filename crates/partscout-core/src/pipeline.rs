//! Pipeline orchestration: normalize → dedupe → rank → filter.
//!
//! The pipeline is pure and synchronous. Provider fan-out, timeouts, and
//! any per-item network work (redirect resolution, image fetching) are the
//! caller's job and happen before or after this function, never inside it.

use url::Url;

use crate::candidate::{NormalizedResult, ProviderBatch, RankMode};
use crate::dedupe::dedupe_results;
use crate::normalize::normalize_candidates;
use crate::rank::rank_results;

/// Runs the full result pipeline over per-provider candidate batches.
///
/// 1. Normalize each batch, tagging results with the batch's provider id.
/// 2. Flatten in batch order and dedupe across all providers.
/// 3. Rank under `mode`.
/// 4. URL sanitation: re-parse each product URL, rewrite it to the parsed
///    URL's canonical serialization, and drop the item if parsing fails.
/// 5. Drop results whose URL is a Google search-results page — unless that
///    would drop every remaining result, in which case the exclusion is
///    skipped and the sanitized set is returned as-is.
///
/// Never fails: empty input yields an empty output, and the output is
/// fully deterministic for a fixed input order.
#[must_use]
pub fn run_pipeline(batches: Vec<ProviderBatch>, mode: RankMode) -> Vec<NormalizedResult> {
    let normalized: Vec<NormalizedResult> = batches
        .into_iter()
        .flat_map(|batch| normalize_candidates(batch.candidates, &batch.provider_id))
        .collect();

    let ranked = rank_results(dedupe_results(normalized), mode);

    let sanitized: Vec<NormalizedResult> = ranked
        .into_iter()
        .filter_map(|mut result| {
            let parsed = Url::parse(&result.product_url).ok()?;
            result.product_url = parsed.to_string();
            Some(result)
        })
        .collect();

    let (kept, excluded): (Vec<NormalizedResult>, Vec<NormalizedResult>) = sanitized
        .into_iter()
        .partition(|result| !is_search_results_page(&result.product_url));

    if kept.is_empty() {
        // Exclusion would empty the response; better to surface the
        // aggregator links than nothing at all.
        excluded
    } else {
        kept
    }
}

/// Whether the URL points at a generic search-results page on a known
/// aggregator host rather than a product page.
fn is_search_results_page(product_url: &str) -> bool {
    Url::parse(product_url).is_ok_and(|url| {
        url.host_str().is_some_and(|host| host.contains("google.com"))
            && url.path().contains("/search")
    })
}
