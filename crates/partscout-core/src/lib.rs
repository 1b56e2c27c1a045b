pub mod app_config;
pub mod candidate;
mod config;
pub mod dedupe;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod rank;

pub use app_config::{AppConfig, Environment};
pub use candidate::{NormalizedResult, ProviderBatch, ProviderCandidate, RankMode};
pub use config::{load_app_config, load_app_config_from_env};
pub use dedupe::dedupe_results;
pub use error::{ConfigError, CoreError};
pub use normalize::normalize_candidates;
pub use pipeline::run_pipeline;
pub use rank::rank_results;
