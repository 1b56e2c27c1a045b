//! Best-effort resolution of redirect-wrapping product URLs.
//!
//! SerpAPI and Google results often point at tracking redirects rather
//! than the merchant page. Resolution happens after the core pipeline has
//! ranked and filtered — it is network post-processing, not ranking input.

use std::time::Duration;

use reqwest::Url;

const RESOLVE_TIMEOUT: Duration = Duration::from_secs(3);

/// Builds the client used for redirect resolution.
///
/// # Errors
///
/// Returns `reqwest::Error` if the client cannot be constructed.
pub(crate) fn build_resolver() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(RESOLVE_TIMEOUT)
        .user_agent("partscout/0.1 (marketplace-search)")
        .build()
}

/// Whether the URL is worth a resolution round-trip: known redirect
/// wrappers only, so merchant links go out untouched.
pub(crate) fn should_resolve_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    host.contains("serpapi.com")
        || host.contains("google.com")
        || host.contains("googleusercontent.com")
        || parsed.path().contains("/url")
}

/// Follows the redirect chain and returns the final URL, or the original
/// on any failure. Tries HEAD first and falls back to GET for endpoints
/// that reject HEAD.
pub(crate) async fn resolve_final_url(client: &reqwest::Client, url: &str) -> String {
    match client.head(url).send().await {
        Ok(response) => response.url().to_string(),
        Err(_) => match client.get(url).send().await {
            Ok(response) => response.url().to_string(),
            Err(e) => {
                tracing::debug!(url, error = %e, "redirect resolution failed, keeping original");
                url.to_owned()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn known_redirect_hosts_are_resolved() {
        assert!(should_resolve_url("https://serpapi.com/link/abc"));
        assert!(should_resolve_url("https://www.google.com/url?q=x"));
        assert!(should_resolve_url(
            "https://lh3.googleusercontent.com/something"
        ));
    }

    #[test]
    fn url_wrapper_paths_are_resolved_on_any_host() {
        assert!(should_resolve_url("https://tracker.example.com/url?dest=x"));
    }

    #[test]
    fn merchant_urls_are_left_alone() {
        assert!(!should_resolve_url("https://store.example.com/pads"));
        assert!(!should_resolve_url("not a url"));
    }

    #[tokio::test]
    async fn follows_redirect_chain_to_final_url() {
        let server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/redirect"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/final"),
            )
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/final"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = build_resolver().unwrap();
        let resolved =
            resolve_final_url(&client, &format!("{}/redirect", server.uri())).await;
        assert!(resolved.ends_with("/final"));
    }

    #[tokio::test]
    async fn unreachable_url_keeps_the_original() {
        let client = build_resolver().unwrap();
        let resolved = resolve_final_url(&client, "http://127.0.0.1:1/x").await;
        assert_eq!(resolved, "http://127.0.0.1:1/x");
    }
}
