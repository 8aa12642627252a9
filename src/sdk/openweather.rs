//! OpenWeatherMap current-conditions client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::sdk::user_agent;
use crate::service::weather::WeatherProvider;
use crate::types::{Coordinates, WeatherSnapshot};

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    #[serde(default)]
    cod: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    weather: Vec<WeatherEntry>,
    #[serde(default)]
    main: Option<MainBlock>,
}

#[derive(Debug, Deserialize)]
struct WeatherEntry {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    #[serde(default)]
    temp: Option<f64>,
}

/// `cod` is a number on success and usually a string on errors.
fn cod_is_ok(cod: &Option<Value>) -> bool {
    match cod {
        Some(Value::Number(n)) => n.as_i64() == Some(200),
        Some(Value::String(s)) => s == "200",
        _ => false,
    }
}

fn upstream(message: impl Into<String>) -> Error {
    Error::Upstream {
        message: message.into(),
        source: None,
    }
}

/// Weather provider backed by the OpenWeatherMap API.
#[derive(Debug, Clone)]
pub struct OpenWeatherMap {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherMap {
    /// Metric units, Korean descriptions.
    const UNITS: &'static str = "metric";
    const LANG: &'static str = "kr";

    /// Create a client for `base_url` (the `/weather` endpoint).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent())
            .connect_timeout(Duration::from_secs(3))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMap {
    async fn current_conditions(&self, coords: Coordinates) -> Result<WeatherSnapshot> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lng.to_string()),
                ("appid", self.api_key.clone()),
                ("units", Self::UNITS.to_string()),
                ("lang", Self::LANG.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::upstream("weather request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(upstream(format!("Weather API HTTP error: {}", status)));
        }

        let data: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream("weather response is not valid JSON", e))?;

        if !cod_is_ok(&data.cod) {
            return Err(upstream(format!(
                "Weather API error code: {:?}, message: {:?}",
                data.cod, data.message
            )));
        }

        let description = data
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .ok_or_else(|| upstream("weather response has no conditions"))?;
        let temperature_celsius = data
            .main
            .and_then(|m| m.temp)
            .ok_or_else(|| upstream("weather response has no temperature"))?;

        Ok(WeatherSnapshot {
            description,
            temperature_celsius,
        })
    }
}
