//! Store resolution: free-text name to the best fuzzy-matched store.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::types::StoreMatch;

/// Client-facing message for a blank store name.
pub const INVALID_STORE_NAME: &str = "업체명을 입력해주세요";

/// The fuzzy store search collaborator.
///
/// Implementations return candidates at or above `threshold`, ranked by
/// descending score, best first.
#[async_trait]
pub trait StoreSearch: Send + Sync {
    async fn search(&self, name: &str, threshold: f64) -> Result<Vec<StoreMatch>>;
}

/// Resolves a store name against the search collaborator.
pub struct StoreResolver {
    search: Arc<dyn StoreSearch>,
    threshold: f64,
    timeout: Duration,
}

impl StoreResolver {
    /// Create a resolver with a fixed threshold and a bounded wait.
    pub fn new(search: Arc<dyn StoreSearch>, threshold: f64, timeout: Duration) -> Self {
        Self {
            search,
            threshold,
            timeout,
        }
    }

    /// The similarity threshold passed to every search.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Resolve `raw_name` to the best match.
    ///
    /// The collaborator's ranking is trusted as-is: the first candidate wins,
    /// so equal top scores resolve in the collaborator's row order.
    pub async fn resolve(&self, raw_name: &str) -> Result<StoreMatch> {
        let name = raw_name.trim();
        if name.is_empty() {
            warn!("Empty store_name after trim");
            return Err(Error::InvalidInput(INVALID_STORE_NAME.to_string()));
        }

        debug!("Searching for store: \"{}\"", name);

        let candidates =
            match tokio::time::timeout(self.timeout, self.search.search(name, self.threshold))
                .await
            {
                Ok(Ok(candidates)) => candidates,
                Ok(Err(e)) => {
                    error!("Store search failed for \"{}\": {:?}", name, e);
                    return Err(match e {
                        Error::Upstream { .. } => e,
                        other => Error::upstream("store search failed", other),
                    });
                }
                Err(_) => {
                    let seconds = self.timeout.as_secs();
                    error!("Store search for \"{}\" timed out after {}s", name, seconds);
                    return Err(Error::upstream(
                        "store search timed out",
                        Error::Timeout { seconds },
                    ));
                }
            };

        let Some(mut best) = candidates.into_iter().next() else {
            info!("No match found for: \"{}\"", name);
            return Err(Error::NotFound {
                query: name.to_string(),
                threshold: self.threshold,
            });
        };

        if !(0.0..=1.0).contains(&best.score) {
            warn!(
                "Search returned out-of-range score {} for \"{}\", clamping",
                best.score, best.matched_name
            );
            best.score = if best.score.is_nan() {
                0.0
            } else {
                best.score.clamp(0.0, 1.0)
            };
        }

        info!(
            "Matched: \"{}\" -> \"{}\" (score: {:.3})",
            name, best.matched_name, best.score
        );
        Ok(best)
    }
}
