//! Weather enrichment and greeting output types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phrase used when the matched store has no coordinates.
pub const NO_WEATHER_PHRASE: &str = "날씨 정보 없음";

/// Phrase used whenever a weather lookup fails for any reason.
pub const WEATHER_FALLBACK_PHRASE: &str = "날씨 정보를 가져올 수 없습니다";

/// Current conditions reported by the weather collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub description: String,
    pub temperature_celsius: f64,
}

/// Outcome of weather enrichment. Never an error: failures are data.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherReport {
    /// Live conditions, temperature rounded half-up to whole degrees.
    Current { description: String, temperature: i64 },
    /// The store has no coordinates; no lookup was attempted.
    NoCoordinates,
    /// The lookup failed, timed out, or is not configured.
    Unavailable,
}

impl WeatherReport {
    /// Build a report from a snapshot.
    pub fn from_snapshot(snapshot: WeatherSnapshot) -> Self {
        Self::Current {
            description: snapshot.description,
            temperature: round_half_up(snapshot.temperature_celsius),
        }
    }
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current {
                description,
                temperature,
            } => write!(f, "현재 {}, {}°C", description, temperature),
            Self::NoCoordinates => f.write_str(NO_WEATHER_PHRASE),
            Self::Unavailable => f.write_str(WEATHER_FALLBACK_PHRASE),
        }
    }
}

/// Round to the nearest integer, with .5 going up (also for negatives).
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// The `greet_store` tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreetingResult {
    pub greeting: String,
    pub weather_summary: String,
    pub matched_name: String,
    pub similarity_score: f64,
}
