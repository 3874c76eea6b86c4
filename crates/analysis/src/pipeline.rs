//! End-to-end analysis: search, select, load, process, render.

use std::sync::Arc;

use tokio::time::{timeout_at, Instant};
use tracing::info;

use crate::cache::CacheKey;
use crate::context::AnalysisContext;
use crate::engine::{process, ProcessingOptions};
use crate::error::{AnalysisError, Result};
use crate::loader::BandGrids;
use crate::render::{render_grid, GridKind};
use crate::request::AnalysisRequest;
use crate::result::{AnalysisResult, GridOutput, SceneSummary, UHI_NOTE};
use crate::scene::{Band, BandKeys, SceneCandidate};
use crate::selector::{rank_candidates, select_best};

/// Candidate scenes for `request`, best first.
pub async fn search(ctx: &AnalysisContext, request: &AnalysisRequest) -> Result<Vec<SceneCandidate>> {
    let deadline = Instant::now() + ctx.config().deadline;
    let mut candidates = find_candidates(ctx, request, deadline).await?;
    rank_candidates(&mut candidates);
    Ok(candidates)
}

/// Run one analysis.
///
/// Search, band loading and processing share the context's deadline; running
/// out of time is reported as [`AnalysisError::CatalogUnavailable`] during
/// search and as [`AnalysisError::FetchTimeout`] afterwards. Results are
/// served from and stored in the context's cache when one is configured.
pub async fn analyze(ctx: &AnalysisContext, request: &AnalysisRequest) -> Result<Arc<AnalysisResult>> {
    let key = CacheKey::new(request, &Band::ALL);
    if let Some(hit) = ctx.cache().and_then(|cache| cache.get(&key)) {
        info!(scene = %hit.scene.id, "serving cached analysis");
        return Ok(hit);
    }

    let deadline = Instant::now() + ctx.config().deadline;
    let candidates = find_candidates(ctx, request, deadline).await?;
    let scene = select_best(&candidates)?;
    info!(
        scene = %scene.id,
        cloud_cover = scene.cloud_cover,
        acquired = %scene.acquired,
        candidates = candidates.len(),
        "scene selected"
    );

    let band_keys = band_label(&ctx.config().band_keys);
    let bands = timeout_at(
        deadline,
        ctx.loader().load_bands(&scene, request.bbox(), &Band::ALL),
    )
    .await
    .map_err(|_| AnalysisError::FetchTimeout {
        scene: scene.id.clone(),
        band: band_keys.clone(),
    })??;

    let options = ctx.config().processing_options();
    let result = process_within(scene, *request.bbox(), bands, options, deadline, band_keys).await?;
    info!(
        scene = %result.scene.id,
        uhi_magnitude = result.uhi_magnitude,
        correlation = ?result.correlation,
        "analysis complete"
    );

    let result = Arc::new(result);
    if let Some(cache) = ctx.cache() {
        cache.insert(key, Arc::clone(&result));
    }
    Ok(result)
}

async fn find_candidates(
    ctx: &AnalysisContext,
    request: &AnalysisRequest,
    deadline: Instant,
) -> Result<Vec<SceneCandidate>> {
    timeout_at(
        deadline,
        ctx.catalog()
            .find_candidates(request.bbox(), request.dates(), request.max_cloud_cover()),
    )
    .await
    .map_err(|_| AnalysisError::CatalogUnavailable("deadline exceeded during scene search".into()))?
}

/// Asset keys of every band, comma separated.
fn band_label(keys: &BandKeys) -> String {
    Band::ALL
        .iter()
        .map(|&band| keys.key(band))
        .collect::<Vec<_>>()
        .join(",")
}

/// Run processing and rendering on the blocking pool, giving up at
/// `deadline`. The blocking task itself cannot be cancelled and finishes in
/// the background.
async fn process_within(
    scene: SceneCandidate,
    bbox: uhimon_core::BoundingBox,
    bands: BandGrids,
    options: ProcessingOptions,
    deadline: Instant,
    band_keys: String,
) -> Result<AnalysisResult> {
    let scene_id = scene.id.clone();
    let job = tokio::task::spawn_blocking(move || build_result(&scene, bbox, &bands, &options));
    timeout_at(deadline, job)
        .await
        .map_err(|_| AnalysisError::FetchTimeout {
            scene: scene_id,
            band: band_keys,
        })?
        .map_err(|e| AnalysisError::Processing(e.to_string()))?
}

fn build_result(
    scene: &SceneCandidate,
    bbox: uhimon_core::BoundingBox,
    bands: &BandGrids,
    options: &ProcessingOptions,
) -> Result<AnalysisResult> {
    let grids = process(bands, options)?;
    let lst = render_grid(&grids.lst, GridKind::Lst)?;
    let ndvi = render_grid(&grids.ndvi, GridKind::Ndvi)?;

    Ok(AnalysisResult {
        scene: SceneSummary::from(scene),
        bbox,
        lst: GridOutput::new(lst, grids.lst.shape(), grids.lst_stats),
        ndvi: GridOutput::new(ndvi, grids.ndvi.shape(), grids.ndvi_stats),
        correlation: grids.correlation,
        uhi_magnitude: grids.uhi_magnitude,
        uhi_note: UHI_NOTE,
    })
}
