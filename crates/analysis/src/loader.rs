//! Band loading: windowed COG reads resampled onto one WGS84 grid.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;
use uhimon_algorithms::calibration::DN_NODATA;
use uhimon_cloud::{
    warp_nearest, CloudError, CogReader, CogReaderOptions, StacClient, TargetGrid,
};
use uhimon_core::{BoundingBox, Raster, CRS};

use crate::error::{AnalysisError, Result};
use crate::scene::{Band, BandKeys, SceneCandidate};

/// Band rasters of one scene, all on the same grid.
#[derive(Debug, Clone)]
pub struct BandGrids {
    grids: BTreeMap<Band, Raster<u16>>,
}

impl BandGrids {
    /// Fails unless every raster shares shape, geotransform and CRS.
    pub fn new(grids: BTreeMap<Band, Raster<u16>>) -> Result<Self> {
        let mut iter = grids.values();
        if let Some(first) = iter.next() {
            for other in iter {
                first.ensure_same_grid(other)?;
            }
        }
        Ok(Self { grids })
    }

    pub fn get(&self, band: Band) -> Result<&Raster<u16>> {
        self.grids
            .get(&band)
            .ok_or_else(|| AnalysisError::Processing(format!("band '{band}' was not loaded")))
    }

    pub fn bands(&self) -> impl Iterator<Item = Band> + '_ {
        self.grids.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}

impl FromIterator<(Band, Raster<u16>)> for BandGrids {
    /// Collects without the same-grid check; use [`BandGrids::new`] for
    /// rasters of unknown origin.
    fn from_iter<I: IntoIterator<Item = (Band, Raster<u16>)>>(iter: I) -> Self {
        Self {
            grids: iter.into_iter().collect(),
        }
    }
}

/// Source of band rasters for a selected scene.
#[async_trait]
pub trait BandLoader: Send + Sync {
    /// Load `bands` of `scene` covering `bbox`, every result on one grid.
    async fn load_bands(
        &self,
        scene: &SceneCandidate,
        bbox: &BoundingBox,
        bands: &[Band],
    ) -> Result<BandGrids>;
}

/// Options for [`CogBandLoader`].
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub band_keys: BandKeys,
    /// Target pixel size in degrees (default 0.0003, about 30 m).
    pub resolution_deg: f64,
    /// Longest allowed grid axis in pixels (default 2048).
    pub max_grid_dim: usize,
    pub cog: CogReaderOptions,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            band_keys: BandKeys::default(),
            resolution_deg: 0.0003,
            max_grid_dim: 2048,
            cog: CogReaderOptions::default(),
        }
    }
}

/// [`BandLoader`] reading Cloud Optimized GeoTIFF assets over HTTP.
///
/// Bands are fetched concurrently; each is signed when the catalog requires
/// it, read through a window around the request footprint, then resampled
/// nearest-neighbour onto the request grid with DN 0 as fill.
pub struct CogBandLoader {
    stac: Arc<StacClient>,
    options: LoaderOptions,
}

impl CogBandLoader {
    pub fn new(stac: Arc<StacClient>, options: LoaderOptions) -> Self {
        Self { stac, options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    async fn load_band(
        &self,
        scene: &SceneCandidate,
        target: &TargetGrid,
        band: Band,
    ) -> Result<(Band, Raster<u16>)> {
        let key = self.options.band_keys.key(band);
        let fail = |e: CloudError| AnalysisError::from_band(&scene.id, key, e);

        let href = scene
            .asset_href(key)
            .ok_or_else(|| AnalysisError::BandUnavailable {
                scene: scene.id.clone(),
                band: key.to_string(),
                reason: "asset not listed in the scene".into(),
            })?;
        let url = self.stac.sign_asset_href(href).await.map_err(fail)?;

        let mut reader =
            CogReader::open_with_client(&url, self.stac.http().clone(), self.options.cog.clone())
                .await
                .map_err(fail)?;
        let meta = reader.metadata();
        let crs = meta
            .crs
            .or_else(|| scene.epsg.map(CRS::from_epsg))
            .ok_or_else(|| AnalysisError::BandUnavailable {
                scene: scene.id.clone(),
                band: key.to_string(),
                reason: "raster has no coordinate reference system".into(),
            })?;

        let window = target
            .footprint_in(&crs, meta.geo_transform.cell_size())
            .map_err(fail)?;
        let mut source = match reader.read_rect::<u16>(&window).await {
            Ok(raster) => raster,
            Err(CloudError::BBoxOutside) => {
                debug!(scene = %scene.id, band = key, "request lies outside the scene");
                return Ok((band, target.filled(DN_NODATA)));
            }
            Err(e) => return Err(fail(e)),
        };
        if source.crs().is_none() {
            source.set_crs(Some(crs));
        }

        let grid = warp_nearest(&source, target, DN_NODATA).map_err(fail)?;
        debug!(
            scene = %scene.id,
            band = key,
            source_shape = ?source.shape(),
            valid = grid.valid_count(),
            "band loaded"
        );
        Ok((band, grid))
    }
}

#[async_trait]
impl BandLoader for CogBandLoader {
    async fn load_bands(
        &self,
        scene: &SceneCandidate,
        bbox: &BoundingBox,
        bands: &[Band],
    ) -> Result<BandGrids> {
        let target = TargetGrid::for_bbox(*bbox, self.options.resolution_deg, self.options.max_grid_dim)
            .map_err(|e| AnalysisError::InvalidInput(e.to_string()))?;
        debug!(scene = %scene.id, shape = ?target.shape(), "loading bands");

        let loaded = try_join_all(bands.iter().map(|&band| self.load_band(scene, &target, band))).await?;
        BandGrids::new(loaded.into_iter().collect())
    }
}
