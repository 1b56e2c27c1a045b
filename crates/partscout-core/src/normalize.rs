//! Candidate validation and normalization.
//!
//! Converts raw [`ProviderCandidate`] records into [`NormalizedResult`]s,
//! dropping anything incomplete. Drops are a filtering policy, not an
//! error condition — marketplace providers routinely return partial rows
//! and the pipeline simply works with what survives.

use url::Url;

use crate::candidate::{NormalizedResult, ProviderCandidate};

const DEFAULT_MATCH_SCORE: f64 = 0.5;

/// Validates and normalizes one provider's candidates, tagging each
/// surviving result with `provider_id`.
///
/// A candidate is dropped silently when any of the following holds:
/// - product URL, title, or image is absent or empty,
/// - price or currency is absent (empty currency counts as absent),
/// - the product URL fails URL parsing.
///
/// Pure and order-preserving: output order matches input order, one-to-one
/// minus drops.
#[must_use]
pub fn normalize_candidates(
    candidates: Vec<ProviderCandidate>,
    provider_id: &str,
) -> Vec<NormalizedResult> {
    candidates
        .into_iter()
        .filter_map(|candidate| normalize_candidate(candidate, provider_id))
        .collect()
}

fn normalize_candidate(
    candidate: ProviderCandidate,
    provider_id: &str,
) -> Option<NormalizedResult> {
    let product_url = candidate.product_url.filter(|s| !s.is_empty())?;
    let title = candidate.title.filter(|s| !s.is_empty())?;
    let image = candidate.image.filter(|s| !s.is_empty())?;
    let price = candidate.price?;
    let currency = candidate.currency.filter(|s| !s.is_empty())?;

    let parsed = Url::parse(&product_url).ok()?;
    let host = parsed.host_str().unwrap_or_default();
    let store_host = host.strip_prefix("www.").unwrap_or(host).to_owned();

    Some(NormalizedResult {
        provider_id: provider_id.to_owned(),
        title,
        brand: candidate.brand,
        image,
        store: candidate.store.unwrap_or(store_host),
        price,
        currency,
        shipping_price: candidate.shipping_price,
        condition: candidate.condition,
        availability: candidate.availability,
        rating: candidate.rating,
        review_count: candidate.review_count,
        marketplace: candidate.marketplace,
        product_url,
        match_score: candidate.match_score.unwrap_or(DEFAULT_MATCH_SCORE),
    })
}
