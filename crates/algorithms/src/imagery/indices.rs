//! Reflectance and normalized-difference vegetation index
//!
//! NDVI is computed on surface reflectance, not raw DN, so the Level-2
//! offset is applied before differencing.

use uhimon_core::raster::Raster;
use uhimon_core::Result;

use super::{build_output, map_cells};
use crate::calibration::{self, to_reflectance, DN_NODATA};

/// Parameters for [`ndvi`]
#[derive(Debug, Clone, Copy)]
pub struct NdviParams {
    /// Treat values outside [-1, 1] as invalid. Negative Level-2
    /// reflectance can push the ratio out of range. Default: true
    pub mask_out_of_range: bool,
}

impl Default for NdviParams {
    fn default() -> Self {
        Self {
            mask_out_of_range: true,
        }
    }
}

/// Surface reflectance grid from an optical band; no-data DN cells become NaN.
pub fn reflectance(band: &Raster<u16>) -> Result<Raster<f64>> {
    let (rows, cols) = band.shape();
    let nodata = band.nodata().unwrap_or(DN_NODATA);
    let dn = band.data();

    let data = map_cells(rows, cols, |row, col| {
        let v = dn[(row, col)];
        if v == nodata {
            f64::NAN
        } else {
            to_reflectance(v as f64)
        }
    });

    build_output(band, data)
}

/// Compute the normalized difference between two grids:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Cells where either input is invalid, or the sum is exactly zero, are NaN.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    band_a.ensure_same_grid(band_b)?;

    let (rows, cols) = band_a.shape();
    let (a, b) = (band_a.data(), band_b.data());

    let data = map_cells(rows, cols, |row, col| {
        let (va, vb) = (a[(row, col)], b[(row, col)]);
        if band_a.is_nodata(va) || band_b.is_nodata(vb) {
            return f64::NAN;
        }
        calibration::normalized_difference(va, vb)
    });

    build_output(band_a, data)
}

/// Normalized Difference Vegetation Index from raw NIR and red bands
///
/// `NDVI = (NIR - Red) / (NIR + Red)` over surface reflectance.
///
/// Values range from -1 to 1:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil and built-up: 0.0 to 0.2
/// - Water: below 0
pub fn ndvi(nir: &Raster<u16>, red: &Raster<u16>, params: NdviParams) -> Result<Raster<f64>> {
    nir.ensure_same_grid(red)?;

    let nd = normalized_difference(&reflectance(nir)?, &reflectance(red)?)?;
    if !params.mask_out_of_range {
        return Ok(nd);
    }

    let (rows, cols) = nd.shape();
    let values = nd.data();
    let data = map_cells(rows, cols, |row, col| {
        let v = values[(row, col)];
        if (-1.0..=1.0).contains(&v) {
            v
        } else {
            f64::NAN
        }
    });
    build_output(&nd, data)
}
