pub mod ebay;
pub mod error;
pub mod registry;
mod retry;
pub mod serpapi;

pub use ebay::EbayClient;
pub use error::ProviderError;
pub use registry::{build_providers, collect_candidates, fetch_image_base64, Provider, SearchRequest};
pub use serpapi::SerpApiClient;
