//! Best-effort weather enrichment.
//!
//! [`WeatherEnricher::enrich`] returns a [`WeatherReport`], not a `Result`:
//! a weather failure can degrade a greeting but never fail it.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::metrics;
use crate::types::{Coordinates, WeatherReport, WeatherSnapshot};

/// The current-conditions weather collaborator.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_conditions(&self, coords: Coordinates) -> Result<WeatherSnapshot>;
}

/// Wraps a [`WeatherProvider`] with a bounded wait and fallback phrases.
pub struct WeatherEnricher {
    provider: Option<Arc<dyn WeatherProvider>>,
    timeout: Duration,
}

impl WeatherEnricher {
    /// Create an enricher over `provider`.
    pub fn new(provider: Arc<dyn WeatherProvider>, timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            timeout,
        }
    }

    /// An enricher with no provider configured; every lookup falls back.
    pub fn disabled() -> Self {
        Self {
            provider: None,
            timeout: Duration::ZERO,
        }
    }

    /// Look up current conditions, degrading to a fallback on any failure.
    pub async fn enrich(&self, coords: Option<Coordinates>) -> WeatherReport {
        let Some(coords) = coords else {
            debug!("No coordinates; skipping weather lookup");
            return WeatherReport::NoCoordinates;
        };

        let Some(provider) = &self.provider else {
            warn!("WEATHER_API_KEY is not set");
            metrics::record_weather_fallback("not_configured");
            return WeatherReport::Unavailable;
        };

        debug!(
            "Fetching weather for coordinates: {}, {}",
            coords.lat, coords.lng
        );

        match tokio::time::timeout(self.timeout, provider.current_conditions(coords)).await {
            Ok(Ok(snapshot)) => {
                let report = WeatherReport::from_snapshot(snapshot);
                info!("Weather fetched successfully: {}", report);
                report
            }
            Ok(Err(e)) => {
                warn!("Weather API error (non-fatal): {:?}", e);
                metrics::record_weather_fallback("error");
                WeatherReport::Unavailable
            }
            Err(_) => {
                warn!(
                    "Weather API timed out after {}ms (non-fatal)",
                    self.timeout.as_millis()
                );
                metrics::record_weather_fallback("timeout");
                WeatherReport::Unavailable
            }
        }
    }
}
