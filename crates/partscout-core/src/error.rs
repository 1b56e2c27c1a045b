use thiserror::Error;

/// Errors surfaced by the core result pipeline and its boundary types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A ranking mode string outside `cheapest | expensive | best`.
    ///
    /// An unknown mode is a caller configuration error and must fail fast;
    /// it is never silently coerced to a default ordering.
    #[error("unknown ranking mode: {0:?} (expected cheapest, expensive, or best)")]
    UnknownRankMode(String),
}

/// Errors while loading or validating application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
