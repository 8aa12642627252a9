//! Greeting pipeline: resolve the store, enrich with weather, compose.

use tracing::info;

use crate::error::Result;
use crate::service::store::StoreResolver;
use crate::service::weather::WeatherEnricher;
use crate::types::{GreetingResult, StoreMatch, WeatherReport};

/// Placeholder when a store has no registered address.
pub const NO_ADDRESS: &str = "주소 없음";

/// Compose the final payload. Pure string composition.
pub fn compose(store: &StoreMatch, weather: &WeatherReport) -> GreetingResult {
    let address = store
        .address_text
        .as_deref()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or(NO_ADDRESS);

    GreetingResult {
        greeting: format!("어서오세요! {} 인사올립니다!", store.matched_name),
        weather_summary: format!(
            "{}({})는 지금 현재 {}",
            store.matched_name, address, weather
        ),
        matched_name: store.matched_name.clone(),
        similarity_score: store.score,
    }
}

/// The business logic behind `greet_store`.
pub struct GreetingService {
    resolver: StoreResolver,
    weather: WeatherEnricher,
}

impl GreetingService {
    /// Create a greeting service.
    pub fn new(resolver: StoreResolver, weather: WeatherEnricher) -> Self {
        Self { resolver, weather }
    }

    /// Resolve `store_name` and build its greeting. Only resolution can fail.
    pub async fn greet(&self, store_name: &str) -> Result<GreetingResult> {
        let store = self.resolver.resolve(store_name).await?;
        let weather = self.weather.enrich(store.coordinates()).await;
        let result = compose(&store, &weather);

        info!("Successfully processed request for: \"{}\"", store_name.trim());
        Ok(result)
    }
}
