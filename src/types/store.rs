//! Store search types.

use serde::{Deserialize, Serialize};

/// A geographic coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A store candidate returned by the fuzzy search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMatch {
    /// The registered store name that matched
    pub matched_name: String,
    /// Free-text address, if registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_text: Option<String>,
    /// Latitude, if registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude, if registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// Similarity score (0-1)
    pub score: f64,
}

impl StoreMatch {
    /// Coordinates, when both halves are present.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }
}
