//! Provider registry and concurrent fan-out.
//!
//! Providers are enabled by id from configuration; a provider whose
//! credentials are missing is skipped with a warning rather than failing
//! startup. [`collect_candidates`] fans out one request per provider and
//! isolates failures — one provider going down must not cost the others'
//! results.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::future::join_all;

use partscout_core::{AppConfig, ProviderBatch, ProviderCandidate};

use crate::ebay::EbayClient;
use crate::error::ProviderError;
use crate::serpapi::SerpApiClient;

/// One search as the providers see it: a text query or an image, plus an
/// optional caller country. `query` takes precedence when both are set.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub image_url: Option<String>,
    /// Base64-encoded image bytes, required by eBay's visual search.
    /// Prepared by the caller via [`fetch_image_base64`].
    pub image_base64: Option<String>,
    pub country: Option<String>,
}

impl SearchRequest {
    /// Builds a text search.
    #[must_use]
    pub fn text(query: impl Into<String>, country: Option<String>) -> Self {
        Self {
            query: Some(query.into()),
            country,
            ..Self::default()
        }
    }
}

/// A configured marketplace provider.
pub enum Provider {
    Ebay(EbayClient),
    SerpApi(SerpApiClient),
}

impl Provider {
    /// Stable identifier used to tag result batches.
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Ebay(_) => "ebay",
            Provider::SerpApi(_) => "serpapi",
        }
    }

    /// Runs the request against this provider.
    ///
    /// A provider that cannot serve the request shape (eBay visual search
    /// without prepared image bytes, or an image search without an image
    /// URL) returns an empty list rather than an error.
    ///
    /// # Errors
    ///
    /// Propagates the client's [`ProviderError`] on HTTP, auth, or
    /// deserialization failure.
    pub async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ProviderCandidate>, ProviderError> {
        let country = request.country.as_deref();

        if let Some(query) = request.query.as_deref().filter(|q| !q.is_empty()) {
            return match self {
                Provider::Ebay(client) => client.search_by_text(query, country).await,
                Provider::SerpApi(client) => client.search_by_text(query, country).await,
            };
        }

        match self {
            Provider::Ebay(client) => match request.image_base64.as_deref() {
                Some(image) => client.search_by_image(image, country).await,
                None => {
                    tracing::debug!("eBay visual search skipped: no image bytes prepared");
                    Ok(Vec::new())
                }
            },
            Provider::SerpApi(client) => match request.image_url.as_deref() {
                Some(image_url) => client.search_by_image(image_url, country).await,
                None => Ok(Vec::new()),
            },
        }
    }
}

/// Builds the provider registry from configuration, in configured order.
///
/// Providers with missing credentials and unknown provider ids are skipped
/// with a warning.
///
/// # Errors
///
/// Returns [`ProviderError::Http`] if an HTTP client cannot be constructed.
pub fn build_providers(config: &AppConfig) -> Result<Vec<Provider>, ProviderError> {
    let mut providers = Vec::new();

    for id in &config.provider_ids {
        match id.as_str() {
            "ebay" => match (&config.ebay_client_id, &config.ebay_client_secret) {
                (Some(client_id), Some(client_secret)) => {
                    providers.push(Provider::Ebay(EbayClient::new(
                        client_id,
                        client_secret,
                        &config.ebay_marketplace_id,
                        config.provider_timeout_secs,
                        config.provider_max_retries,
                        config.provider_retry_backoff_base_ms,
                    )?));
                }
                _ => {
                    tracing::warn!("eBay provider enabled but credentials are not configured");
                }
            },
            "serpapi" => match &config.serpapi_key {
                Some(key) => {
                    providers.push(Provider::SerpApi(SerpApiClient::new(
                        key,
                        config.provider_timeout_secs,
                        config.provider_max_retries,
                        config.provider_retry_backoff_base_ms,
                    )?));
                }
                None => {
                    tracing::warn!("SerpAPI provider enabled but SERPAPI_KEY is not configured");
                }
            },
            other => {
                tracing::warn!(provider = other, "unknown provider id — skipping");
            }
        }
    }

    Ok(providers)
}

/// Fans the request out to every provider concurrently and returns one
/// batch per provider, in registry order.
///
/// Provider failures are logged and isolated: a failed provider
/// contributes an empty batch.
pub async fn collect_candidates(
    providers: &[Provider],
    request: &SearchRequest,
) -> Vec<ProviderBatch> {
    let searches = providers.iter().map(|provider| async move {
        match provider.search(request).await {
            Ok(candidates) => {
                tracing::debug!(
                    provider = provider.id(),
                    count = candidates.len(),
                    "collected candidates"
                );
                ProviderBatch {
                    provider_id: provider.id().to_owned(),
                    candidates,
                }
            }
            Err(e) => {
                tracing::warn!(provider = provider.id(), error = %e, "provider search failed");
                ProviderBatch {
                    provider_id: provider.id().to_owned(),
                    candidates: Vec::new(),
                }
            }
        }
    });

    join_all(searches).await
}

/// Fetches an image and encodes it as base64 for providers that require
/// inline image bytes (eBay visual search).
///
/// # Errors
///
/// Returns [`ProviderError::Http`] if the image cannot be fetched, or
/// [`ProviderError::UnexpectedStatus`] on a non-2xx response.
pub async fn fetch_image_base64(
    image_url: &str,
    timeout_secs: u64,
) -> Result<String, ProviderError> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?;

    let response = client.get(image_url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::UnexpectedStatus {
            status: status.as_u16(),
            url: image_url.to_owned(),
        });
    }

    let bytes = response.bytes().await?;
    Ok(BASE64.encode(&bytes))
}

#[cfg(test)]
mod tests {
    use partscout_core::app_config::Environment;

    use super::*;

    fn config_with(
        provider_ids: &[&str],
        serpapi_key: Option<&str>,
        ebay: Option<(&str, &str)>,
    ) -> AppConfig {
        AppConfig {
            env: Environment::Test,
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            log_level: "info".to_owned(),
            provider_ids: provider_ids.iter().map(|s| (*s).to_owned()).collect(),
            serpapi_key: serpapi_key.map(ToOwned::to_owned),
            ebay_client_id: ebay.map(|(id, _)| id.to_owned()),
            ebay_client_secret: ebay.map(|(_, secret)| secret.to_owned()),
            ebay_marketplace_id: "EBAY_MOTOR".to_owned(),
            provider_timeout_secs: 5,
            provider_max_retries: 0,
            provider_retry_backoff_base_ms: 0,
            rate_limit_max_requests: 8,
            rate_limit_window_secs: 60,
            session_reuse_window_hours: 24,
        }
    }

    #[test]
    fn build_providers_skips_unconfigured_providers() {
        let config = config_with(&["ebay", "serpapi"], None, None);
        let providers = build_providers(&config).unwrap();
        assert!(providers.is_empty());
    }

    #[test]
    fn build_providers_respects_configured_order() {
        let config = config_with(&["serpapi", "ebay"], Some("sk"), Some(("id", "secret")));
        let providers = build_providers(&config).unwrap();
        let ids: Vec<&str> = providers.iter().map(Provider::id).collect();
        assert_eq!(ids, vec!["serpapi", "ebay"]);
    }

    #[test]
    fn build_providers_skips_unknown_ids() {
        let config = config_with(&["amazon", "serpapi"], Some("sk"), None);
        let providers = build_providers(&config).unwrap();
        let ids: Vec<&str> = providers.iter().map(Provider::id).collect();
        assert_eq!(ids, vec!["serpapi"]);
    }

    #[tokio::test]
    async fn collect_candidates_isolates_provider_failures() {
        // A client pointed at an unroutable address fails fast; the fan-out
        // must still return a (empty) batch for it.
        let broken = Provider::SerpApi(
            SerpApiClient::with_base_url("sk", 1, 0, 0, "http://127.0.0.1:1").unwrap(),
        );
        let batches =
            collect_candidates(&[broken], &SearchRequest::text("brake pads", None)).await;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].provider_id, "serpapi");
        assert!(batches[0].candidates.is_empty());
    }

    #[tokio::test]
    async fn ebay_image_search_without_prepared_bytes_is_empty() {
        let provider = Provider::Ebay(
            EbayClient::with_base_url("id", "secret", "EBAY_MOTOR", 1, 0, 0, "http://127.0.0.1:1")
                .unwrap(),
        );
        let request = SearchRequest {
            image_url: Some("https://cdn.example.com/photo.jpg".to_owned()),
            ..SearchRequest::default()
        };
        let candidates = provider.search(&request).await.unwrap();
        assert!(candidates.is_empty());
    }
}
