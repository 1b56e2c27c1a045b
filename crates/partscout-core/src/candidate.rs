//! Boundary types for the result pipeline.
//!
//! Two explicit record shapes flow through the pipeline: the loose
//! [`ProviderCandidate`] exactly as a marketplace client produced it, and
//! the [`NormalizedResult`] that validation guarantees is complete. The
//! conversion between them lives in [`crate::normalize`] and is total —
//! a candidate either normalizes fully or is dropped.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A single listing as returned by one marketplace provider, before
/// validation. Partial data is routine: no field is required to be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCandidate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    /// Listing image URL or other image reference.
    #[serde(default)]
    pub image: Option<String>,
    /// Merchant display name, when the provider exposes one.
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    /// ISO 4217 currency code (e.g., `"USD"`).
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub shipping_price: Option<f64>,
    /// Listing condition (e.g., `"NEW"`, `"USED"`).
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<i64>,
    /// Provider marketplace identifier (e.g., `"EBAY_AU"`).
    #[serde(default)]
    pub marketplace: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    /// Provider-supplied 0..1 relevance confidence.
    #[serde(default)]
    pub match_score: Option<f64>,
    /// The raw provider payload for this listing, retained verbatim for
    /// later lookup and audit.
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// A validated listing ready for deduplication, ranking, and serialization
/// to callers.
///
/// Invariant: `product_url` parses as a URL, `title` and `image` are
/// non-empty, and `price`/`currency` are present. [`crate::normalize`] is
/// the only producer of this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// Identifier of the provider that produced this listing.
    pub provider_id: String,
    pub title: String,
    pub brand: Option<String>,
    pub image: String,
    /// Merchant name; derived from the product URL host when the provider
    /// omitted it.
    pub store: String,
    pub price: f64,
    /// ISO 4217 currency code.
    pub currency: String,
    pub shipping_price: Option<f64>,
    pub condition: Option<String>,
    pub availability: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub marketplace: Option<String>,
    pub product_url: String,
    /// 0..1 relevance confidence; 0.5 when the provider supplied none.
    pub match_score: f64,
}

impl NormalizedResult {
    /// Price including shipping, with unknown shipping treated as zero.
    #[must_use]
    pub fn effective_price(&self) -> f64 {
        self.price + self.shipping_price.unwrap_or(0.0)
    }
}

/// One provider's candidate listings, tagged with the provider id that
/// produced them. The per-provider inputs to [`crate::run_pipeline`].
#[derive(Debug, Clone)]
pub struct ProviderBatch {
    pub provider_id: String,
    pub candidates: Vec<ProviderCandidate>,
}

/// Result ordering policy. A closed enumeration: parsing any string
/// outside the three canonical names fails with
/// [`CoreError::UnknownRankMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMode {
    /// Effective price ascending.
    Cheapest,
    /// Effective price descending.
    Expensive,
    /// Match score descending, then effective price ascending.
    Best,
}

impl std::fmt::Display for RankMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankMode::Cheapest => write!(f, "cheapest"),
            RankMode::Expensive => write!(f, "expensive"),
            RankMode::Best => write!(f, "best"),
        }
    }
}

impl FromStr for RankMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cheapest" => Ok(RankMode::Cheapest),
            "expensive" => Ok(RankMode::Expensive),
            "best" => Ok(RankMode::Best),
            other => Err(CoreError::UnknownRankMode(other.to_owned())),
        }
    }
}
