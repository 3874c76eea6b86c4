//! Per-pixel derived grids from Landsat bands
//!
//! - **lst**: land surface temperature from the thermal band
//! - **indices**: reflectance, normalized difference and NDVI
//!
//! Every output shares its source grid (shape, transform, CRS) and marks
//! invalid cells with NaN.

mod indices;
mod lst;

pub use indices::{ndvi, normalized_difference, reflectance, NdviParams};
pub use lst::land_surface_temperature;

use ndarray::Array2;
use uhimon_core::raster::{Raster, RasterElement};
use uhimon_core::{Error, Result};

use crate::maybe_rayon::*;

/// Evaluate `cell(row, col)` for every cell, one row per task.
pub(crate) fn map_cells<F>(rows: usize, cols: usize, cell: F) -> Vec<f64>
where
    F: Fn(usize, usize) -> f64 + Send + Sync,
{
    (0..rows)
        .into_par_iter()
        .flat_map(|row| (0..cols).map(|col| cell(row, col)).collect::<Vec<f64>>())
        .collect()
}

/// Wrap row-major `data` as a NaN-nodata grid on `template`'s grid.
pub(crate) fn build_output<T: RasterElement>(
    template: &Raster<T>,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let array = Array2::from_shape_vec(template.shape(), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(template.with_data(array)?.with_nodata(f64::NAN))
}
