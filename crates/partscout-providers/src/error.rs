use thiserror::Error;

/// Errors returned by marketplace provider clients.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Credentials are missing or the provider rejected them.
    #[error("authentication failed for {provider}: {reason}")]
    Auth { provider: String, reason: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid provider base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
