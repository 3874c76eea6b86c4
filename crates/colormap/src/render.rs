//! Raster-to-RGBA rendering using color schemes.

use uhimon_core::raster::{Raster, RasterElement};

use crate::scheme::{evaluate, ColorScheme, Rgb};

/// Parameters for colormap rendering.
#[derive(Debug, Clone)]
pub struct ColormapParams {
    /// Color scheme to use.
    pub scheme: ColorScheme,
    /// Value mapped to the low end. Values below are clamped.
    pub min: f64,
    /// Value mapped to the high end. Values above are clamped.
    pub max: f64,
    /// Color for invalid pixels (RGBA). Default: fully transparent.
    pub nodata_color: [u8; 4],
}

impl ColormapParams {
    /// Create params with an explicit value range.
    pub fn with_range(scheme: ColorScheme, min: f64, max: f64) -> Self {
        Self {
            scheme,
            min,
            max,
            nodata_color: [0, 0, 0, 0],
        }
    }

    /// Normalized position of `value` within the range; 0 for an empty range.
    fn position(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range > 0.0 {
            (value - self.min) / range
        } else {
            0.0
        }
    }
}

/// Stretch the scheme over the raster's own valid range.
///
/// A constant raster maps every valid cell to the low color; a raster with
/// no valid cells gets the range 0..1.
pub fn auto_params<T: RasterElement>(raster: &Raster<T>, scheme: ColorScheme) -> ColormapParams {
    let (min, max) = raster
        .data()
        .iter()
        .filter(|v| !raster.is_nodata(**v))
        .filter_map(|v| v.to_f64())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if min > max {
        return ColormapParams::with_range(scheme, 0.0, 1.0);
    }
    ColormapParams::with_range(scheme, min, max)
}

/// Convert a raster to an RGBA pixel buffer.
///
/// Returns `rows * cols * 4` bytes in row-major order. Cells that are
/// no-data, NaN or infinite get `params.nodata_color`.
pub fn raster_to_rgba<T: RasterElement>(raster: &Raster<T>, params: &ColormapParams) -> Vec<u8> {
    let mut rgba = vec![0u8; raster.len() * 4];

    for (px, val) in rgba.chunks_exact_mut(4).zip(raster.data().iter()) {
        let value = Some(*val)
            .filter(|v| !raster.is_nodata(*v))
            .and_then(|v| v.to_f64())
            .filter(|v| v.is_finite());

        match value {
            Some(v) => {
                let Rgb { r, g, b } = evaluate(params.scheme, params.position(v));
                px.copy_from_slice(&[r, g, b, 255]);
            }
            None => px.copy_from_slice(&params.nodata_color),
        }
    }

    rgba
}
