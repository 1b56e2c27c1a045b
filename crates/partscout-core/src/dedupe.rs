//! Near-duplicate collapsing across and within providers.
//!
//! There is no canonical dedupe key: identity is fuzzy, judged pairwise
//! against previously accepted results as a tuple of (URL host, title
//! similarity, price closeness). The fold is greedy and first-seen-wins,
//! so input order decides survivors — the orchestrator fixes the canonical
//! order (provider iteration order, then within-provider as returned).

use std::collections::HashSet;

use url::Url;

use crate::candidate::NormalizedResult;

/// Jaccard similarity at or above this value counts as "same title".
const SIMILARITY_THRESHOLD: f64 = 0.6;

/// Flat price tolerance in currency units.
const PRICE_TOLERANCE_ABS: f64 = 3.0;

/// Relative price tolerance against the accepted item's price.
const PRICE_TOLERANCE_PCT: f64 = 0.05;

/// Collapses near-duplicates, keeping the first-seen instance of each
/// duplicate group and the original relative order of survivors.
///
/// An incoming item duplicates an accepted one iff all of:
/// 1. same URL host (case-sensitive; hostless URLs never match),
/// 2. title Jaccard similarity ≥ 0.6,
/// 3. `|a − b| ≤ max(3, a × 0.05)` with `a` the accepted item's price.
///
/// Idempotent: running the result through again collapses nothing further.
#[must_use]
pub fn dedupe_results(results: Vec<NormalizedResult>) -> Vec<NormalizedResult> {
    let accepted = results.into_iter().fold(
        Vec::<(Option<String>, NormalizedResult)>::new(),
        |mut accepted, item| {
            let host = url_host(&item.product_url);
            let duplicate = host.is_some()
                && accepted.iter().any(|(existing_host, existing)| {
                    existing_host.as_deref() == host.as_deref()
                        && jaccard_similarity(&existing.title, &item.title)
                            >= SIMILARITY_THRESHOLD
                        && price_close(existing.price, item.price)
                });
            if !duplicate {
                accepted.push((host, item));
            }
            accepted
        },
    );

    accepted.into_iter().map(|(_, item)| item).collect()
}

/// Jaccard index of the two titles' normalized token sets. Defined as 0
/// when either token set is empty, so degenerate titles never match.
#[must_use]
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a_tokens = title_tokens(a);
    let b_tokens = title_tokens(b);
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0.0;
    }

    let intersection = a_tokens.intersection(&b_tokens).count();
    let union = a_tokens.union(&b_tokens).count();

    #[allow(clippy::cast_precision_loss)]
    let similarity = intersection as f64 / union as f64;
    similarity
}

/// Tokenizes a title for similarity comparison: lowercase, every run of
/// non-alphanumeric characters becomes a single separator, split on the
/// separators. Manual char scan, no regex needed.
fn title_tokens(title: &str) -> HashSet<String> {
    let normalized: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();

    normalized.split_whitespace().map(ToOwned::to_owned).collect()
}

/// Whether two prices are close enough to be duplicate-eligible. The
/// tolerance is the larger of a flat 3 currency units or 5% of `a`.
fn price_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= PRICE_TOLERANCE_ABS.max(a * PRICE_TOLERANCE_PCT)
}

fn url_host(product_url: &str) -> Option<String> {
    Url::parse(product_url)
        .ok()
        .and_then(|u| u.host_str().map(ToOwned::to_owned))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(title: &str, url: &str, price: f64) -> NormalizedResult {
        NormalizedResult {
            provider_id: "ebay".to_owned(),
            title: title.to_owned(),
            brand: None,
            image: "https://cdn.example.com/img.jpg".to_owned(),
            store: "store.example.com".to_owned(),
            price,
            currency: "USD".to_owned(),
            shipping_price: None,
            condition: None,
            availability: None,
            rating: None,
            review_count: None,
            marketplace: None,
            product_url: url.to_owned(),
            match_score: 0.5,
        }
    }

    // -----------------------------------------------------------------------
    // jaccard_similarity
    // -----------------------------------------------------------------------

    #[test]
    fn identical_token_sets_have_similarity_one() {
        let similarity =
            jaccard_similarity("Brake Pad Set OEM123", "OEM123 Brake Pad Set");
        assert!((similarity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn punctuation_and_case_are_ignored() {
        let similarity = jaccard_similarity("Brake-Pad  SET!! (OEM123)", "brake pad set oem123");
        assert!((similarity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn similarity_exactly_at_threshold() {
        // Token sets {oil, filter, kit, oem} and {oil, filter, kit, v2}:
        // intersection 3, union 5.
        let similarity = jaccard_similarity("Oil Filter Kit OEM", "Oil Filter Kit V2");
        assert!((similarity - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn similarity_just_below_threshold() {
        // Intersection 4, union 7 → 4/7 ≈ 0.571.
        let similarity =
            jaccard_similarity("alpha beta gamma delta epsilon", "alpha beta gamma delta zeta eta");
        assert!(similarity < SIMILARITY_THRESHOLD);
        assert!((similarity - 4.0 / 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_token_sets_have_similarity_zero() {
        assert!((jaccard_similarity("", "") - 0.0).abs() < f64::EPSILON);
        assert!((jaccard_similarity("!!!", "???") - 0.0).abs() < f64::EPSILON);
        assert!((jaccard_similarity("", "brake pads") - 0.0).abs() < f64::EPSILON);
    }

    // -----------------------------------------------------------------------
    // price_close
    // -----------------------------------------------------------------------

    #[test]
    fn flat_tolerance_boundary() {
        // 5% of 50 is 2.5, so the flat 3-unit tolerance applies.
        assert!(price_close(50.0, 53.0));
        assert!(!price_close(50.0, 53.01));
    }

    #[test]
    fn percentage_tolerance_boundary() {
        // 5% of 100 is 5, above the flat tolerance.
        assert!(price_close(100.0, 105.0));
        assert!(!price_close(100.0, 105.01));
    }

    #[test]
    fn tolerance_is_symmetric_around_the_first_price() {
        assert!(price_close(100.0, 95.0));
        assert!(!price_close(100.0, 94.99));
    }

    // -----------------------------------------------------------------------
    // dedupe_results
    // -----------------------------------------------------------------------

    #[test]
    fn reworded_close_priced_listings_collapse_to_first_seen() {
        let results = dedupe_results(vec![
            make_result(
                "Brake Pad Set OEM123",
                "https://store.example.com/pads-1",
                49.99,
            ),
            make_result(
                "OEM123 Brake Pad Set",
                "https://store.example.com/pads-2",
                51.00,
            ),
        ]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Brake Pad Set OEM123");
    }

    #[test]
    fn distant_prices_keep_both_listings() {
        let results = dedupe_results(vec![
            make_result(
                "Brake Pad Set OEM123",
                "https://store.example.com/pads-1",
                49.99,
            ),
            make_result(
                "OEM123 Brake Pad Set",
                "https://store.example.com/pads-2",
                60.00,
            ),
        ]);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn different_hosts_are_never_duplicates() {
        let results = dedupe_results(vec![
            make_result("Brake Pad Set", "https://store-a.example.com/pads", 49.99),
            make_result("Brake Pad Set", "https://store-b.example.com/pads", 49.99),
        ]);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn dissimilar_titles_on_same_host_are_kept() {
        let results = dedupe_results(vec![
            make_result("Brake Pad Set", "https://store.example.com/pads", 49.99),
            make_result("Cabin Air Filter", "https://store.example.com/filter", 49.99),
        ]);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn punctuation_only_titles_never_match() {
        let results = dedupe_results(vec![
            make_result("!!!", "https://store.example.com/a", 10.0),
            make_result("???", "https://store.example.com/b", 10.0),
        ]);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let input = vec![
            make_result("Brake Pad Set OEM123", "https://store.example.com/1", 49.99),
            make_result("OEM123 Brake Pad Set", "https://store.example.com/2", 51.00),
            make_result("Cabin Air Filter", "https://store.example.com/3", 15.00),
            make_result("Wiper Blades 22in", "https://other.example.com/4", 12.50),
        ];
        let once = dedupe_results(input);
        let twice = dedupe_results(once.clone());
        assert_eq!(once.len(), twice.len());
        let once_titles: Vec<&str> = once.iter().map(|r| r.title.as_str()).collect();
        let twice_titles: Vec<&str> = twice.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(once_titles, twice_titles);
    }

    #[test]
    fn survivors_keep_original_relative_order() {
        let results = dedupe_results(vec![
            make_result("Wiper Blades", "https://a.example.com/1", 12.50),
            make_result("Brake Pad Set", "https://b.example.com/2", 49.99),
            make_result("Brake Pad Set", "https://b.example.com/3", 50.50),
            make_result("Cabin Air Filter", "https://c.example.com/4", 15.00),
        ]);
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Wiper Blades", "Brake Pad Set", "Cabin Air Filter"]
        );
    }

    #[test]
    fn title_similarity_at_threshold_collapses() {
        let results = dedupe_results(vec![
            make_result("Oil Filter Kit OEM", "https://store.example.com/1", 20.0),
            make_result("Oil Filter Kit V2", "https://store.example.com/2", 20.0),
        ]);
        assert_eq!(results.len(), 1);
    }
}
