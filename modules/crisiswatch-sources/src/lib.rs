pub mod adapter;
pub mod cache;
pub mod climate;
pub mod conflict;
pub mod economic;
pub mod news;

pub use adapter::{FetchOptions, SourceAdapter};
pub use cache::ProviderCache;
pub use climate::ClimateAdapter;
pub use conflict::ConflictAdapter;
pub use economic::EconomicAdapter;
pub use news::NewsAdapter;

use std::sync::Arc;

use crisiswatch_common::Config;

/// Build the standard four-family adapter set from configuration.
pub fn standard_adapters(config: &Config) -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(ConflictAdapter::new(
            config.acled_api_key.clone(),
            config.acled_email.clone(),
            config.fusion.provider_ttl,
            config.fusion.fetch_timeout,
        )),
        Arc::new(EconomicAdapter::new(
            config.fusion.provider_ttl,
            config.fusion.fetch_timeout,
        )),
        Arc::new(ClimateAdapter::new(
            config.fusion.provider_ttl,
            config.fusion.fetch_timeout,
        )),
        Arc::new(NewsAdapter::new(
            config.fusion.provider_ttl,
            config.fusion.fetch_timeout,
        )),
    ]
}
