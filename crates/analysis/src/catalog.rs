//! Scene discovery.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use uhimon_cloud::stac_models::{SortDirection, CLOUD_COVER};
use uhimon_cloud::{StacClient, StacSearchParams};
use uhimon_core::BoundingBox;

use crate::error::{AnalysisError, Result};
use crate::request::DateRange;
use crate::scene::SceneCandidate;

/// Source of candidate scenes for a region and period.
#[async_trait]
pub trait SceneCatalog: Send + Sync {
    /// Scenes intersecting `bbox`, acquired within `dates`, with cloud cover
    /// at or below `max_cloud_cover`. An empty list is not an error.
    async fn find_candidates(
        &self,
        bbox: &BoundingBox,
        dates: &DateRange,
        max_cloud_cover: f64,
    ) -> Result<Vec<SceneCandidate>>;
}

/// [`SceneCatalog`] backed by a STAC API.
pub struct StacSceneCatalog {
    client: Arc<StacClient>,
    collection: String,
}

impl StacSceneCatalog {
    pub fn new(client: Arc<StacClient>, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }

    fn search_params(&self, bbox: &BoundingBox, dates: &DateRange, max_cloud: f64) -> StacSearchParams {
        StacSearchParams::new()
            .bbox(bbox)
            .datetime(dates.stac_interval())
            .collections(&[self.collection.as_str()])
            .max_cloud_cover(max_cloud)
            .sort_by(CLOUD_COVER, SortDirection::Asc)
            .limit(50)
    }
}

#[async_trait]
impl SceneCatalog for StacSceneCatalog {
    async fn find_candidates(
        &self,
        bbox: &BoundingBox,
        dates: &DateRange,
        max_cloud_cover: f64,
    ) -> Result<Vec<SceneCandidate>> {
        let params = self.search_params(bbox, dates, max_cloud_cover);
        let items = self
            .client
            .search_all(&params)
            .await
            .map_err(|e| AnalysisError::CatalogUnavailable(e.to_string()))?;

        let total = items.len();
        let candidates: Vec<SceneCandidate> = items
            .iter()
            .filter_map(|item| match SceneCandidate::try_from(item) {
                Ok(scene) => Some(scene),
                Err(reason) => {
                    warn!(item = %item.id, %reason, "skipping catalog record");
                    None
                }
            })
            // Catalogs may ignore the query extension.
            .filter(|scene| scene.cloud_cover <= max_cloud_cover)
            .collect();

        debug!(
            returned = total,
            usable = candidates.len(),
            collection = %self.collection,
            "catalog search"
        );
        Ok(candidates)
    }
}
