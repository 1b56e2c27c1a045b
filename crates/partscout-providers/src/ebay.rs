//! eBay Browse API client.
//!
//! Authenticates with the OAuth2 client-credentials grant and caches the
//! token in-process until shortly before expiry. Text search hits
//! `item_summary/search`; image search posts a base64 payload to
//! `item_summary/search_by_image`. Worldwide queries (no country, or
//! `WORLD`) fall back across a fixed marketplace list: text search takes
//! the first marketplace that returns anything, image search unions them.

use std::time::{Duration, Instant};

use reqwest::{Client, Url};
use tokio::sync::Mutex;

use partscout_core::ProviderCandidate;

use crate::error::ProviderError;
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://api.ebay.com/";
const OAUTH_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";
const RESULT_LIMIT: &str = "50";

/// Marketplaces tried for worldwide searches, in order.
const WORLDWIDE_MARKETPLACES: &[&str] =
    &["EBAY_US", "EBAY_MOTOR", "EBAY_GB", "EBAY_AU", "EBAY_CA"];

/// Renew the cached token when less than this much lifetime remains.
const TOKEN_EXPIRY_SLACK: Duration = Duration::from_secs(60);

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Client for the eBay Browse API.
pub struct EbayClient {
    client: Client,
    client_id: String,
    client_secret: String,
    default_marketplace: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
    token: Mutex<Option<CachedToken>>,
}

impl EbayClient {
    /// Creates a new client pointed at the production eBay API.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        client_id: &str,
        client_secret: &str,
        default_marketplace: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(
            client_id,
            client_secret,
            default_marketplace,
            timeout_secs,
            max_retries,
            backoff_base_ms,
            DEFAULT_BASE_URL,
        )
    }

    /// Creates a new client with a custom base URL (for testing with
    /// wiremock). Both the OAuth and Browse endpoints resolve against it.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ProviderError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    #[allow(clippy::too_many_arguments)]
    pub fn with_base_url(
        client_id: &str,
        client_secret: &str,
        default_marketplace: &str,
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
        let base_url = Url::parse(&normalised).map_err(|e| ProviderError::InvalidBaseUrl {
            url: normalised.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
            default_marketplace: default_marketplace.to_owned(),
            base_url,
            max_retries,
            backoff_base_ms,
            token: Mutex::new(None),
        })
    }

    /// Searches listings by text query.
    ///
    /// Queries the marketplace mapped from `country` first; worldwide
    /// searches then fall back across [`WORLDWIDE_MARKETPLACES`] until one
    /// returns results. Fallback failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::Auth`] if the OAuth grant is rejected.
    /// - [`ProviderError::Http`] / [`ProviderError::UnexpectedStatus`] if
    ///   the primary marketplace request fails.
    pub async fn search_by_text(
        &self,
        query: &str,
        country: Option<&str>,
    ) -> Result<Vec<ProviderCandidate>, ProviderError> {
        let token = self.access_token().await?;
        let primary = self.marketplace_from_country(country);

        let results = self.search_marketplace(query, &primary, &token).await?;
        if !results.is_empty() {
            return Ok(results);
        }

        if is_worldwide(country) {
            for marketplace in WORLDWIDE_MARKETPLACES {
                if *marketplace == primary {
                    continue;
                }
                match self.search_marketplace(query, marketplace, &token).await {
                    Ok(results) if !results.is_empty() => return Ok(results),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(marketplace, error = %e, "eBay fallback marketplace failed");
                    }
                }
            }
        }

        Ok(Vec::new())
    }

    /// Searches listings visually similar to a base64-encoded image.
    ///
    /// Worldwide searches union results across [`WORLDWIDE_MARKETPLACES`];
    /// per-marketplace failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Auth`] if the OAuth grant is rejected.
    pub async fn search_by_image(
        &self,
        image_base64: &str,
        country: Option<&str>,
    ) -> Result<Vec<ProviderCandidate>, ProviderError> {
        let token = self.access_token().await?;

        let primary = self.marketplace_from_country(country);
        let marketplaces: Vec<&str> = if is_worldwide(country) {
            WORLDWIDE_MARKETPLACES.to_vec()
        } else {
            vec![primary.as_str()]
        };

        let mut results = Vec::new();
        for marketplace in marketplaces {
            match self
                .search_marketplace_by_image(image_base64, marketplace, &token)
                .await
            {
                Ok(items) => results.extend(items),
                Err(e) => {
                    tracing::warn!(marketplace, error = %e, "eBay image search failed");
                }
            }
        }

        Ok(results)
    }

    async fn search_marketplace(
        &self,
        query: &str,
        marketplace: &str,
        token: &str,
    ) -> Result<Vec<ProviderCandidate>, ProviderError> {
        let mut url = self.endpoint("buy/browse/v1/item_summary/search");
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", RESULT_LIMIT)
            .append_pair("auto_correct", "KEYWORD")
            .append_pair("filter", "buyingOptions:{FIXED_PRICE}");

        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .bearer_auth(token)
                    .header("X-EBAY-C-MARKETPLACE-ID", marketplace)
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ProviderError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                Ok(response.json::<serde_json::Value>().await?)
            }
        })
        .await?;

        Ok(extract_item_summaries(&body, marketplace))
    }

    async fn search_marketplace_by_image(
        &self,
        image_base64: &str,
        marketplace: &str,
        token: &str,
    ) -> Result<Vec<ProviderCandidate>, ProviderError> {
        let mut url = self.endpoint("buy/browse/v1/item_summary/search_by_image");
        url.query_pairs_mut().append_pair("limit", RESULT_LIMIT);
        let payload = serde_json::json!({ "image": image_base64 });

        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            let payload = payload.clone();
            async move {
                let response = self
                    .client
                    .post(url.clone())
                    .bearer_auth(token)
                    .header("X-EBAY-C-MARKETPLACE-ID", marketplace)
                    .json(&payload)
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ProviderError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                Ok(response.json::<serde_json::Value>().await?)
            }
        })
        .await?;

        Ok(extract_item_summaries(&body, marketplace))
    }

    /// Returns a valid access token, fetching a fresh one when the cached
    /// token is absent or within [`TOKEN_EXPIRY_SLACK`] of expiry.
    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.token.lock().await;
        if let Some(existing) = cached.as_ref() {
            if existing.expires_at > Instant::now() + TOKEN_EXPIRY_SLACK {
                return Ok(existing.token.clone());
            }
        }

        let url = self.endpoint("identity/v1/oauth2/token");
        let response = self
            .client
            .post(url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", OAUTH_SCOPE),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Auth {
                provider: "ebay".to_owned(),
                reason: format!("token endpoint returned {status}"),
            });
        }

        let body = response.json::<serde_json::Value>().await?;
        let parsed: TokenResponse =
            serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
                context: "eBay OAuth token response".to_owned(),
                source: e,
            })?;

        let token = parsed.access_token;
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + Duration::from_secs(parsed.expires_in),
        });

        Ok(token)
    }

    fn endpoint(&self, path: &str) -> Url {
        self.base_url
            .join(path)
            .unwrap_or_else(|_| self.base_url.clone())
    }

    fn marketplace_from_country(&self, country: Option<&str>) -> String {
        let Some(country) = country.filter(|c| !c.is_empty() && *c != "WORLD") else {
            return self.default_marketplace.clone();
        };
        let mapped = match country {
            "AUS" => "EBAY_AU",
            "USA" => "EBAY_US",
            "GBR" => "EBAY_GB",
            "CAN" => "EBAY_CA",
            "NZL" => "EBAY_NZ",
            "DEU" | "EU" => "EBAY_DE",
            "FRA" => "EBAY_FR",
            _ => return self.default_marketplace.clone(),
        };
        mapped.to_owned()
    }
}

fn is_worldwide(country: Option<&str>) -> bool {
    country.is_none_or(|c| c.is_empty() || c == "WORLD")
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    7200
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct EbayItemSummary {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    image: Option<EbayImage>,
    #[serde(default)]
    thumbnail_images: Vec<EbayImage>,
    #[serde(default)]
    price: Option<EbayAmount>,
    #[serde(default)]
    shipping_options: Vec<EbayShippingOption>,
    #[serde(default)]
    seller: Option<EbaySeller>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    estimated_availability_status: Option<String>,
    #[serde(default)]
    item_web_url: Option<String>,
    #[serde(default)]
    item_affiliate_web_url: Option<String>,
    #[serde(default)]
    item_href: Option<String>,
    #[serde(default)]
    match_score: Option<f64>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct EbayImage {
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct EbayAmount {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct EbayShippingOption {
    #[serde(default)]
    shipping_cost: Option<EbayAmount>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct EbaySeller {
    #[serde(default)]
    username: Option<String>,
}

fn extract_item_summaries(body: &serde_json::Value, marketplace: &str) -> Vec<ProviderCandidate> {
    body.get("itemSummaries")
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| map_item(item, marketplace))
                .collect()
        })
        .unwrap_or_default()
}

/// Maps one Browse API item summary to a candidate. Items missing any of
/// title, image, price, currency, or product URL are skipped here — they
/// could never survive normalization anyway.
fn map_item(value: &serde_json::Value, marketplace: &str) -> Option<ProviderCandidate> {
    let item: EbayItemSummary = serde_json::from_value(value.clone()).unwrap_or_default();

    let image_url = item
        .image
        .as_ref()
        .and_then(|i| i.image_url.clone())
        .or_else(|| {
            item.thumbnail_images
                .first()
                .and_then(|i| i.image_url.clone())
        })?;

    let title = item.title.filter(|t| !t.is_empty())?;
    let price = item.price.as_ref()?;
    let price_value = price.value.as_deref()?.parse::<f64>().ok()?;
    let currency = price.currency.clone()?;

    let product_url = item
        .item_web_url
        .or(item.item_affiliate_web_url)
        .or(item.item_href)?;

    let shipping_price = item
        .shipping_options
        .first()
        .and_then(|o| o.shipping_cost.as_ref())
        .and_then(|cost| cost.value.as_deref())
        .and_then(|v| v.parse::<f64>().ok());

    Some(ProviderCandidate {
        title: Some(title),
        brand: item.brand,
        image: Some(image_url),
        store: Some(
            item.seller
                .and_then(|s| s.username)
                .unwrap_or_else(|| "ebay.com".to_owned()),
        ),
        price: Some(price_value),
        currency: Some(currency),
        shipping_price,
        condition: item.condition,
        availability: item.estimated_availability_status,
        rating: None,
        review_count: None,
        marketplace: Some(marketplace.to_owned()),
        product_url: Some(product_url),
        match_score: item.match_score,
        raw: value.clone(),
    })
}
