//! SerpAPI client: Google Lens image search and Google Shopping text search.
//!
//! ## Observed response shape
//!
//! SerpAPI result items are loosely shaped and vary by engine:
//! - `price` may be a bare number, a decorated string (`"$49.99"`,
//!   `"1,299.00"`), or absent. [`safe_number`] coerces all of these.
//! - The image lives in `thumbnail`, `image`, or `thumbnail_url`
//!   depending on the engine.
//! - No currency field is guaranteed; a `$` in the raw price string is
//!   taken as USD.
//! - `position` is 1-based result rank; relevance decays linearly with it.

use std::time::Duration;

use reqwest::{Client, Url};

use partscout_core::ProviderCandidate;

use crate::error::ProviderError;
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://serpapi.com/";

/// Client for the SerpAPI search endpoint.
///
/// Use [`SerpApiClient::new`] for production or
/// [`SerpApiClient::with_base_url`] to point at a mock server in tests.
pub struct SerpApiClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl SerpApiClient {
    /// Creates a new client pointed at the production SerpAPI endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, timeout_secs, max_retries, backoff_base_ms, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ProviderError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("partscout/0.1 (marketplace-search)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalised).map_err(|e| ProviderError::InvalidBaseUrl {
                url: normalised.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Runs a Google Lens visual search for listings matching an image.
    ///
    /// Combines `visual_matches` and `shopping_results` from the response,
    /// in that order.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::Http`] on network failure.
    /// - [`ProviderError::UnexpectedStatus`] on a non-2xx response.
    pub async fn search_by_image(
        &self,
        image_url: &str,
        country: Option<&str>,
    ) -> Result<Vec<ProviderCandidate>, ProviderError> {
        let mut params = vec![("engine", "google_lens"), ("url", image_url)];
        let gl = country.and_then(map_country_to_gl);
        if let Some(gl) = gl.as_deref() {
            params.push(("gl", gl));
        }

        let body = self.request_json("search.json", &params).await?;
        let mut items = extract_items(&body, "visual_matches");
        items.extend(extract_items(&body, "shopping_results"));
        Ok(items)
    }

    /// Runs a Google Shopping text search.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::Http`] on network failure.
    /// - [`ProviderError::UnexpectedStatus`] on a non-2xx response.
    pub async fn search_by_text(
        &self,
        query: &str,
        country: Option<&str>,
    ) -> Result<Vec<ProviderCandidate>, ProviderError> {
        let mut params = vec![("engine", "google_shopping"), ("q", query)];
        let gl = country.and_then(map_country_to_gl);
        if let Some(gl) = gl.as_deref() {
            params.push(("gl", gl));
        }

        let body = self.request_json("search.json", &params).await?;
        Ok(extract_items(&body, "shopping_results"))
    }

    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self
            .base_url
            .join(path)
            .unwrap_or_else(|_| self.base_url.clone());
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("api_key", &self.api_key);
        }
        url
    }

    async fn request_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, ProviderError> {
        let url = self.build_url(path, params);
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ProviderError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                let body = response.json::<serde_json::Value>().await?;
                Ok(body)
            }
        })
        .await
    }
}

/// Tolerant item shape shared by the Google Lens and Google Shopping
/// engines. Every field is optional; aliased fields cover the engines'
/// naming differences.
#[derive(Debug, Default, serde::Deserialize)]
struct SerpApiItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    merchant: Option<String>,
    #[serde(default)]
    store: Option<String>,
    #[serde(default)]
    price: serde_json::Value,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    shipping: serde_json::Value,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    availability: Option<String>,
    #[serde(default)]
    stock: Option<String>,
    #[serde(default)]
    rating: serde_json::Value,
    #[serde(default)]
    reviews: serde_json::Value,
    #[serde(default)]
    product_link: Option<String>,
    #[serde(default)]
    source_link: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    position: Option<i64>,
}

fn extract_items(body: &serde_json::Value, key: &str) -> Vec<ProviderCandidate> {
    body.get(key)
        .and_then(serde_json::Value::as_array)
        .map(|items| items.iter().map(map_item).collect())
        .unwrap_or_default()
}

fn map_item(value: &serde_json::Value) -> ProviderCandidate {
    let item: SerpApiItem = serde_json::from_value(value.clone()).unwrap_or_default();

    let price = safe_number(&item.price);
    let currency = item.currency.clone().or_else(|| {
        // SerpAPI often omits the currency; a dollar sign in the raw
        // price string is the only signal.
        item.price
            .as_str()
            .filter(|raw| raw.contains('$'))
            .map(|_| "USD".to_owned())
    });

    #[allow(clippy::cast_precision_loss)]
    let match_score = item
        .position
        .map(|position| (1.0 - position as f64 / 100.0).max(0.0));

    ProviderCandidate {
        title: Some(
            item.title
                .or(item.name)
                .unwrap_or_else(|| "Untitled item".to_owned()),
        ),
        brand: item.brand,
        image: item.thumbnail.or(item.image).or(item.thumbnail_url),
        store: item.source.or(item.merchant).or(item.store),
        price,
        currency,
        shipping_price: safe_number(&item.shipping),
        condition: item.condition,
        availability: item.availability.or(item.stock),
        rating: safe_number(&item.rating),
        review_count: review_count(&item.reviews),
        marketplace: None,
        product_url: item.product_link.or(item.source_link).or(item.link),
        match_score,
        raw: value.clone(),
    }
}

/// Coerces a loosely typed numeric field: bare numbers pass through,
/// strings are stripped of everything but digits and dots before parsing.
fn safe_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        serde_json::Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn review_count(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        _ => safe_number(value).map(|f| f as i64),
    }
}

/// Maps a caller country code to a SerpAPI `gl` parameter. Unrecognized
/// codes pass through lowercased.
fn map_country_to_gl(country: &str) -> Option<String> {
    if country.is_empty() {
        return None;
    }
    let normalized = country.to_lowercase();
    let mapped = match normalized.as_str() {
        "aus" | "au" => "au",
        "usa" | "us" => "us",
        "eu" => "eu",
        "gbr" | "uk" | "gb" => "gb",
        "can" | "ca" => "ca",
        "nzl" | "nz" => "nz",
        "deu" | "de" => "de",
        "fra" | "fr" => "fr",
        _ => return Some(normalized),
    };
    Some(mapped.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_number_passes_through_numbers() {
        assert_eq!(safe_number(&serde_json::json!(49.99)), Some(49.99));
        assert_eq!(safe_number(&serde_json::json!(50)), Some(50.0));
    }

    #[test]
    fn safe_number_strips_currency_decorations() {
        assert_eq!(safe_number(&serde_json::json!("$49.99")), Some(49.99));
        assert_eq!(safe_number(&serde_json::json!("1,299.00")), Some(1299.0));
    }

    #[test]
    fn safe_number_rejects_non_numeric() {
        assert_eq!(safe_number(&serde_json::json!("free shipping")), None);
        assert_eq!(safe_number(&serde_json::Value::Null), None);
        assert_eq!(safe_number(&serde_json::json!({"value": 3})), None);
    }

    #[test]
    fn country_mapping_covers_known_codes() {
        assert_eq!(map_country_to_gl("AUS").as_deref(), Some("au"));
        assert_eq!(map_country_to_gl("usa").as_deref(), Some("us"));
        assert_eq!(map_country_to_gl("UK").as_deref(), Some("gb"));
        assert_eq!(map_country_to_gl("FRA").as_deref(), Some("fr"));
    }

    #[test]
    fn country_mapping_passes_unknown_codes_lowercased() {
        assert_eq!(map_country_to_gl("JPN").as_deref(), Some("jpn"));
        assert_eq!(map_country_to_gl(""), None);
    }

    #[test]
    fn map_item_reads_decorated_price_and_infers_usd() {
        let value = serde_json::json!({
            "title": "Brake Pad Set OEM123",
            "thumbnail": "https://serpapi.example/thumb.jpg",
            "source": "store.example.com",
            "price": "$49.99",
            "link": "https://store.example.com/pads",
            "position": 3
        });
        let candidate = map_item(&value);
        assert_eq!(candidate.title.as_deref(), Some("Brake Pad Set OEM123"));
        assert_eq!(candidate.price, Some(49.99));
        assert_eq!(candidate.currency.as_deref(), Some("USD"));
        assert_eq!(
            candidate.product_url.as_deref(),
            Some("https://store.example.com/pads")
        );
        let score = candidate.match_score.unwrap();
        assert!((score - 0.97).abs() < 1e-9);
        assert_eq!(candidate.raw, value);
    }

    #[test]
    fn map_item_does_not_infer_currency_without_dollar_sign() {
        let value = serde_json::json!({
            "title": "Brake Pad Set",
            "price": "49,99",
            "link": "https://store.example.com/pads"
        });
        let candidate = map_item(&value);
        assert!(candidate.currency.is_none());
    }

    #[test]
    fn map_item_position_past_one_hundred_clamps_to_zero() {
        let value = serde_json::json!({"title": "x", "position": 250});
        let candidate = map_item(&value);
        assert_eq!(candidate.match_score, Some(0.0));
    }

    #[test]
    fn map_item_defaults_title() {
        let candidate = map_item(&serde_json::json!({}));
        assert_eq!(candidate.title.as_deref(), Some("Untitled item"));
        assert!(candidate.image.is_none());
    }
}
