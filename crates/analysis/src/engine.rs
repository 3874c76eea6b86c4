//! Band rasters to derived grids and their statistics.

use tracing::debug;
use uhimon_algorithms::imagery::{land_surface_temperature, ndvi, NdviParams};
use uhimon_algorithms::statistics::{
    pearson_correlation, summary_statistics, uhi_magnitude, Statistics,
};
use uhimon_core::Raster;

use crate::error::{AnalysisError, Result};
use crate::loader::BandGrids;
use crate::render::GridKind;
use crate::scene::Band;

/// Options for [`process`].
#[derive(Debug, Clone, Copy)]
pub struct ProcessingOptions {
    /// Minimum valid cells each derived grid must hold (default 3).
    pub min_valid_cells: usize,
    pub ndvi: NdviParams,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            min_valid_cells: 3,
            ndvi: NdviParams::default(),
        }
    }
}

/// Derived grids of one scene with their statistics.
#[derive(Debug, Clone)]
pub struct ProcessedGrids {
    /// Surface temperature, °C.
    pub lst: Raster<f64>,
    pub ndvi: Raster<f64>,
    pub lst_stats: Statistics,
    pub ndvi_stats: Statistics,
    /// `None` when fewer than two cells are valid in both grids or either
    /// grid is constant over them.
    pub correlation: Option<f64>,
    /// Valid LST range, °C.
    pub uhi_magnitude: f64,
}

/// Compute LST, NDVI, statistics, correlation and UHI magnitude.
pub fn process(bands: &BandGrids, options: &ProcessingOptions) -> Result<ProcessedGrids> {
    let lst = land_surface_temperature(bands.get(Band::Thermal)?)?;
    let ndvi = ndvi(bands.get(Band::Nir)?, bands.get(Band::Red)?, options.ndvi)?;

    let lst_stats = statistics(&lst, GridKind::Lst, options.min_valid_cells)?;
    let ndvi_stats = statistics(&ndvi, GridKind::Ndvi, options.min_valid_cells)?;
    let correlation = pearson_correlation(&lst, &ndvi)?;
    let uhi_magnitude = uhi_magnitude(&lst)?;

    debug!(
        lst_valid = lst_stats.valid_count,
        ndvi_valid = ndvi_stats.valid_count,
        ?correlation,
        uhi_magnitude,
        "grids processed"
    );

    Ok(ProcessedGrids {
        lst,
        ndvi,
        lst_stats,
        ndvi_stats,
        correlation,
        uhi_magnitude,
    })
}

fn statistics(grid: &Raster<f64>, kind: GridKind, min_valid: usize) -> Result<Statistics> {
    summary_statistics(grid, min_valid).map_err(|e| match e {
        uhimon_core::Error::InsufficientData { valid, required } => {
            AnalysisError::InsufficientValidData {
                grid: kind,
                valid,
                required,
            }
        }
        other => other.into(),
    })
}
