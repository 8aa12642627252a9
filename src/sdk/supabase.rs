//! Supabase (PostgREST) client for the fuzzy store search.
//!
//! Calls the `search_similar_store` database function, which ranks stores by
//! trigram similarity and filters by the given threshold.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::sdk::user_agent;
use crate::service::store::StoreSearch;
use crate::types::StoreMatch;

/// Name of the ranking database function.
pub const SEARCH_FUNCTION: &str = "search_similar_store";

#[derive(Debug, Serialize)]
struct SearchSimilarStoreRequest<'a> {
    search_name: &'a str,
    similarity_threshold: f64,
}

/// One row returned by `search_similar_store`.
#[derive(Debug, Deserialize)]
struct StoreRow {
    store_name: String,
    #[serde(default)]
    address_text: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
    score: f64,
}

impl From<StoreRow> for StoreMatch {
    fn from(row: StoreRow) -> Self {
        Self {
            matched_name: row.store_name,
            address_text: row.address_text.filter(|a| !a.is_empty()),
            lat: row.lat,
            lng: row.lng,
            score: row.score,
        }
    }
}

/// Store search backed by a Supabase RPC call.
#[derive(Debug, Clone)]
pub struct SupabaseStoreSearch {
    client: Client,
    rpc_url: String,
    service_key: String,
}

impl SupabaseStoreSearch {
    /// Create a client for the project at `supabase_url`.
    pub fn new(supabase_url: &str, service_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent())
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rpc_url: format!(
                "{}/rest/v1/rpc/{}",
                supabase_url.trim_end_matches('/'),
                SEARCH_FUNCTION
            ),
            service_key: service_key.into(),
        })
    }

    /// Fail on non-success status, keeping the body for the logs.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Upstream {
            message: format!("{} returned {}: {}", SEARCH_FUNCTION, status, body),
            source: None,
        })
    }
}

#[async_trait]
impl StoreSearch for SupabaseStoreSearch {
    async fn search(&self, name: &str, threshold: f64) -> Result<Vec<StoreMatch>> {
        let request = SearchSimilarStoreRequest {
            search_name: name,
            similarity_threshold: threshold,
        };

        let response = self
            .client
            .post(&self.rpc_url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::upstream("store search request failed", e))?;

        let rows: Vec<StoreRow> = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream("store search returned malformed rows", e))?;

        debug!("{} returned {} rows for \"{}\"", SEARCH_FUNCTION, rows.len(), name);
        Ok(rows.into_iter().map(StoreMatch::from).collect())
    }
}
