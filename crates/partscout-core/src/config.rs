use crate::app_config::{AppConfig, Environment};
use crate::error::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if any value fails to parse.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if any value fails to parse.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup
/// function. The parsing/validation logic is decoupled from the real
/// environment so tests can drive it from a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let env = parse_environment(&or_default("PARTSCOUT_ENV", "development"))?;
    let bind_addr = parse_addr("PARTSCOUT_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PARTSCOUT_LOG_LEVEL", "info");

    let provider_ids: Vec<String> = or_default("PARTSCOUT_PROVIDER_IDS", "ebay,serpapi")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    let serpapi_key = lookup("SERPAPI_KEY").ok();
    let ebay_client_id = lookup("EBAY_CLIENT_ID").ok();
    let ebay_client_secret = lookup("EBAY_CLIENT_SECRET").ok();
    let ebay_marketplace_id = or_default("EBAY_MARKETPLACE_ID", "EBAY_MOTOR");

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        provider_ids,
        serpapi_key,
        ebay_client_id,
        ebay_client_secret,
        ebay_marketplace_id,
        provider_timeout_secs: parse_u64("PARTSCOUT_PROVIDER_TIMEOUT_SECS", "20")?,
        provider_max_retries: parse_u32("PARTSCOUT_PROVIDER_MAX_RETRIES", "2")?,
        provider_retry_backoff_base_ms: parse_u64("PARTSCOUT_PROVIDER_RETRY_BACKOFF_BASE_MS", "500")?,
        rate_limit_max_requests: parse_usize("PARTSCOUT_RATE_LIMIT_MAX_REQUESTS", "8")?,
        rate_limit_window_secs: parse_u64("PARTSCOUT_RATE_LIMIT_WINDOW_SECS", "60")?,
        session_reuse_window_hours: parse_u64("PARTSCOUT_SESSION_REUSE_HOURS", "24")?,
    })
}

fn parse_environment(raw: &str) -> Result<Environment, ConfigError> {
    match raw {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PARTSCOUT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}
