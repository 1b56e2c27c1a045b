use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Provider ids to query, in fan-out order.
    pub provider_ids: Vec<String>,
    pub serpapi_key: Option<String>,
    pub ebay_client_id: Option<String>,
    pub ebay_client_secret: Option<String>,
    /// Default eBay marketplace when no country is given.
    pub ebay_marketplace_id: String,
    pub provider_timeout_secs: u64,
    pub provider_max_retries: u32,
    pub provider_retry_backoff_base_ms: u64,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: u64,
    /// How long a completed search session satisfies repeat queries.
    pub session_reuse_window_hours: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("provider_ids", &self.provider_ids)
            .field(
                "serpapi_key",
                &self.serpapi_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "ebay_client_id",
                &self.ebay_client_id.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "ebay_client_secret",
                &self.ebay_client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("ebay_marketplace_id", &self.ebay_marketplace_id)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("provider_max_retries", &self.provider_max_retries)
            .field(
                "provider_retry_backoff_base_ms",
                &self.provider_retry_backoff_base_ms,
            )
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field(
                "session_reuse_window_hours",
                &self.session_reuse_window_hours,
            )
            .finish()
    }
}
